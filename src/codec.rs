//! Codec capability set shared by the transport attempts.
//!
//! The set is ordered: the relay picks the first entry it can produce, so
//! preference is expressed purely by position.

/// Ordered list of codec identifiers the client claims to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSet {
    codecs: Vec<String>,
}

impl CodecSet {
    pub fn new(codecs: Vec<String>) -> Self {
        Self { codecs }
    }

    /// Build the advertised capability string for one transport by keeping
    /// the codecs that pass the transport's support test (segment-support
    /// for the segment path, decode-support elsewhere), comma-joined in
    /// preference order.
    pub fn advertise<F>(&self, supported: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        self.codecs
            .iter()
            .filter(|c| supported(c))
            .cloned()
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codecs.iter().map(|c| c.as_str())
    }
}

impl Default for CodecSet {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_CODECS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advertise_preserves_order() {
        let set = CodecSet::default();
        let advertised = set.advertise(|_| true);
        assert!(advertised.starts_with("avc1.640029,"));
        assert!(advertised.ends_with(",opus"));
    }

    #[test]
    fn test_advertise_filters_unsupported() {
        let set = CodecSet::default();
        let advertised = set.advertise(|c| c.starts_with("avc1."));
        assert_eq!(advertised, "avc1.640029,avc1.64002A,avc1.640033");
    }

    #[test]
    fn test_advertise_empty_when_nothing_supported() {
        let set = CodecSet::default();
        assert_eq!(set.advertise(|_| false), "");
    }
}
