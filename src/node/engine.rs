//! Access decision engine: one camera frame in, one decision out.
//!
//! The pipeline is frame -> face detection -> largest face -> chip
//! normalization -> descriptor extraction -> verdict. No face in view
//! is **no decision**, not an error: the node stays idle and nothing is
//! asked of the verdict source. Descriptor extraction is offloaded to a
//! blocking worker; the verdict source sees only the finished
//! descriptor, so where extraction runs never changes the decision.
//!
//! A verdict comes from exactly one source, fixed at construction:
//! the remote authority (networked deployments) or the local
//! descriptor matcher (offline deployments). The two are never mixed
//! within one decision. An unreachable or unsuccessful authority is a
//! denial, never a grant.

use std::sync::Arc;

use crate::authority::MainNode;
use crate::error::{Error, Result};
use crate::hardware::Camera;
use crate::recognition::{DescriptorMatcher, FaceNormalizer, Recognizer};
use crate::types::User;

/// Outcome of one access check that saw a face.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    /// Unlock the door. The user is present in networked mode; local
    /// registry matches carry no user record.
    Granted {
        /// The identified visitor, for display and visit reporting.
        user: Option<User>,
    },
    /// Keep the door locked.
    Denied,
}

/// Where verdicts come from. Fixed at engine construction.
pub enum VerdictSource {
    /// Ask the remote authority per descriptor.
    Authority(Arc<dyn MainNode>),
    /// Consult the local identity registry only.
    LocalRegistry(Arc<DescriptorMatcher>),
}

/// The frame-to-decision pipeline.
pub struct AccessEngine {
    camera: Arc<dyn Camera>,
    normalizer: FaceNormalizer,
    recognizer: Arc<dyn Recognizer>,
    source: VerdictSource,
}

impl AccessEngine {
    /// Assembles the pipeline from its injected capabilities.
    pub fn new(
        camera: Arc<dyn Camera>,
        normalizer: FaceNormalizer,
        recognizer: Arc<dyn Recognizer>,
        source: VerdictSource,
    ) -> Self {
        Self {
            camera,
            normalizer,
            recognizer,
            source,
        }
    }

    /// Runs one access check. `Ok(None)` when no face is in view.
    ///
    /// # Errors
    ///
    /// Camera and recognition failures propagate; they are
    /// per-iteration faults the controller logs and survives. Verdict
    /// failures do **not** propagate -- an unreachable authority
    /// produces a denial.
    pub async fn check(&self) -> Result<Option<AccessDecision>> {
        let frame = self.camera.frame()?;
        let Some(chip) = self.normalizer.normalize(&frame)? else {
            return Ok(None);
        };

        let recognizer = Arc::clone(&self.recognizer);
        let descriptor = tokio::task::spawn_blocking(move || recognizer.extract_descriptor(&chip))
            .await
            .map_err(|e| Error::Recognition(format!("extraction worker failed: {e}")))??;

        let decision = match &self.source {
            VerdictSource::Authority(authority) => {
                match authority.check_access_by_descriptor(&descriptor).await {
                    Ok(Some(check)) if check.is_known && check.accessed => {
                        AccessDecision::Granted { user: check.user }
                    }
                    Ok(Some(check)) => {
                        if check.is_known {
                            tracing::info!(
                                user_id = check.user.as_ref().map(|u| u.id),
                                "known visitor without current permission"
                            );
                        }
                        AccessDecision::Denied
                    }
                    Ok(None) => {
                        tracing::warn!("authority gave no verdict, denying");
                        AccessDecision::Denied
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "authority unreachable, denying");
                        AccessDecision::Denied
                    }
                }
            }
            VerdictSource::LocalRegistry(matcher) => match matcher.find_match(&descriptor) {
                Some(id) => {
                    tracing::info!(identity = id, "local registry match");
                    AccessDecision::Granted { user: None }
                }
                None => AccessDecision::Denied,
            },
        };
        Ok(Some(decision))
    }
}
