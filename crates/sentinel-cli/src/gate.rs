//! Request gate: authentication, then admission
//!
//! Runs before routing for every gated request. Authentication can be
//! skipped by path; admission control can not.

use crate::auth::extract_credential;
use crate::ApiError;
use sentinel_core::AdmissionController;
use sentinel_crypto::TokenSigner;
use std::sync::Arc;

/// Result of one gate stage
#[derive(Debug)]
pub enum GateOutcome {
    /// Hand the request to the next stage
    Continue,
    /// Stop and answer with this error
    Reject(ApiError),
}

impl GateOutcome {
    /// Whether the request may proceed
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    AnyDepth,
    Glob(Vec<char>),
}

/// Ant-style path glob.
///
/// `**` matches zero or more whole segments; within a segment `*` matches
/// any run of characters and `?` exactly one.
#[derive(Clone, Debug)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern such as `/auth/**`
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "**" => Segment::AnyDepth,
                glob => Segment::Glob(glob.chars().collect()),
            })
            .collect();

        Self {
            source: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a request path against the pattern
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let open_ended = matches!(self.segments.last(), Some(Segment::AnyDepth));
        if !open_ended && self.source.ends_with('/') != path.ends_with('/') && path != "/" {
            return false;
        }
        match_segments(&self.segments, &parts)
    }
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((Segment::Glob(glob), rest)) => match path.split_first() {
            Some((head, tail)) => match_glob(glob, head) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn match_glob(glob: &[char], text: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let (mut g, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match glob.get(g) {
            Some('*') => {
                backtrack = Some((g, t));
                g += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                g += 1;
                t += 1;
            }
            _ => match backtrack {
                // Let the last star swallow one more character
                Some((star, consumed)) => {
                    g = star + 1;
                    t = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }

    glob[g..].iter().all(|&c| c == '*')
}

/// The two-stage filter in front of every gated route
pub struct RequestGate {
    bypass: Vec<PathPattern>,
    signer: Arc<TokenSigner>,
    admission: Arc<AdmissionController>,
}

impl RequestGate {
    /// Build a gate from bypass globs and the shared components
    pub fn new(bypass_patterns: &[String], signer: Arc<TokenSigner>, admission: Arc<AdmissionController>) -> Self {
        Self {
            bypass: bypass_patterns.iter().map(|p| PathPattern::new(p)).collect(),
            signer,
            admission,
        }
    }

    /// The admission controller behind stage two
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Whether `path` skips authentication
    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass.iter().any(|pattern| pattern.matches(path))
    }

    /// Stage one: token check unless the path is bypassed
    pub fn authenticate(&self, path: &str, authorization: Option<&str>) -> GateOutcome {
        if self.is_bypassed(path) {
            tracing::debug!(path, "Authentication bypassed");
            return GateOutcome::Continue;
        }

        let valid = authorization
            .and_then(extract_credential)
            .is_some_and(|token| self.signer.validate(token));
        if valid {
            GateOutcome::Continue
        } else {
            tracing::debug!(path, "Missing or invalid credentials");
            GateOutcome::Reject(ApiError::Unauthorized)
        }
    }

    /// Stage two: admission control, keyed by path
    pub async fn admit(&self, path: &str) -> GateOutcome {
        if self.admission.is_allowed(path).await {
            GateOutcome::Continue
        } else {
            tracing::info!(path, "Rate limit exceeded");
            GateOutcome::Reject(ApiError::RateLimited)
        }
    }

    /// Run both stages in order, stopping at the first rejection
    pub async fn check(&self, path: &str, authorization: Option<&str>) -> GateOutcome {
        match self.authenticate(path, authorization) {
            GateOutcome::Continue => self.admit(path).await,
            reject => reject,
        }
    }
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let patterns: Vec<&str> = self.bypass.iter().map(PathPattern::as_str).collect();
        f.debug_struct("RequestGate")
            .field("bypass", &patterns)
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}
