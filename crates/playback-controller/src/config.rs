use crate::error::ControllerError;
use crate::resource::ResourceId;

/// Queue and transition policy for a [`PlaybackController`](crate::PlaybackController).
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// URL schemes the controller accepts into its queue.
    pub schemes: Vec<String>,
    /// Whether the same identifier may appear in the queue more than once.
    pub allow_duplicates: bool,
    /// Move on to the next item when the engine reports the end of the current one.
    pub auto_advance: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            schemes: vec!["file".to_string(), "http".to_string(), "https".to_string()],
            allow_duplicates: true,
            auto_advance: true,
        }
    }
}

impl ControllerConfig {
    /// Whether `scheme` is in the allow-list (case-insensitive).
    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.schemes.iter().any(|s| s.eq_ignore_ascii_case(scheme))
    }

    /// Reject identifiers whose scheme this controller does not play.
    pub(crate) fn check(&self, resource: &ResourceId) -> Result<(), ControllerError> {
        if self.allows_scheme(resource.scheme()) {
            Ok(())
        } else {
            Err(ControllerError::invalid(
                resource.as_str(),
                format!("unsupported scheme {:?}", resource.scheme()),
            ))
        }
    }

    /// Validate a batch against the policy and the already queued items.
    ///
    /// Either every item is admissible or the first offending one is reported.
    pub(crate) fn check_batch(
        &self,
        queued: &[ResourceId],
        batch: &[ResourceId],
    ) -> Result<(), ControllerError> {
        for (i, resource) in batch.iter().enumerate() {
            self.check(resource)?;
            if !self.allow_duplicates
                && (queued.contains(resource) || batch[..i].contains(resource))
            {
                return Err(ControllerError::Duplicate(resource.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ResourceId {
        ResourceId::parse(s).unwrap()
    }

    #[test]
    fn default_allows_file_and_http() {
        let cfg = ControllerConfig::default();
        assert!(cfg.allows_scheme("file"));
        assert!(cfg.allows_scheme("HTTPS"));
        assert!(!cfg.allows_scheme("rtsp"));
        assert!(cfg.allow_duplicates);
        assert!(cfg.auto_advance);
    }

    #[test]
    fn check_rejects_unsupported_scheme() {
        let cfg = ControllerConfig::default();
        let err = cfg.check(&id("rtsp://camera/stream")).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidResource { .. }));
    }

    #[test]
    fn check_batch_reports_duplicates_when_disabled() {
        let cfg = ControllerConfig {
            allow_duplicates: false,
            ..ControllerConfig::default()
        };
        let queued = vec![id("http://h/a.mp3")];
        assert_eq!(
            cfg.check_batch(&queued, &[id("http://h/a.mp3")]),
            Err(ControllerError::Duplicate("http://h/a.mp3".to_string()))
        );
        assert_eq!(
            cfg.check_batch(&[], &[id("http://h/b.mp3"), id("http://h/b.mp3")]),
            Err(ControllerError::Duplicate("http://h/b.mp3".to_string()))
        );
        assert!(cfg.check_batch(&queued, &[id("http://h/b.mp3")]).is_ok());
    }

    #[test]
    fn check_batch_permits_duplicates_by_default() {
        let cfg = ControllerConfig::default();
        let queued = vec![id("http://h/a.mp3")];
        assert!(
            cfg.check_batch(&queued, &[id("http://h/a.mp3"), id("http://h/a.mp3")])
                .is_ok()
        );
    }
}
