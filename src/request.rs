use crate::model::GraphModel;
use std::sync::Arc;

/// Lifecycle of a single "generate my wall" request
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum RequestState {
    #[default]
    Idle,
    Loading {
        username: String,
    },
    Ready(Arc<GraphModel>),
    Failed {
        message: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Transition {
    Ok,
    Ignored,
}

impl RequestState {
    pub(crate) fn new() -> RequestState {
        RequestState::default()
    }

    /// Start loading a graph for `username`.  Blank usernames and submissions
    /// made while another request is in flight are ignored.
    pub(crate) fn submit(&mut self, username: &str) -> Transition {
        let username = username.trim();
        if username.is_empty() || self.is_loading() {
            return Transition::Ignored;
        }
        *self = RequestState::Loading {
            username: username.to_owned(),
        };
        Transition::Ok
    }

    pub(crate) fn resolve(&mut self, model: GraphModel) -> Transition {
        match self {
            RequestState::Loading { username } if username.eq_ignore_ascii_case(&model.username) => {
                *self = RequestState::Ready(Arc::new(model));
                Transition::Ok
            }
            _ => Transition::Ignored,
        }
    }

    pub(crate) fn reject<E: std::error::Error>(&mut self, error: &E) -> Transition {
        if !self.is_loading() {
            return Transition::Ignored;
        }
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(e) = source {
            message.push_str(": ");
            message.push_str(&e.to_string());
            source = e.source();
        }
        *self = RequestState::Failed { message };
        Transition::Ok
    }

    pub(crate) fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading { .. })
    }

    pub(crate) fn model(&self) -> Option<Arc<GraphModel>> {
        match self {
            RequestState::Ready(model) => Some(Arc::clone(model)),
            _ => None,
        }
    }

    pub(crate) fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use time::macros::datetime;

    fn model(username: &str) -> GraphModel {
        GraphModel {
            username: username.into(),
            years: Vec::new(),
            generated_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut state = RequestState::new();
        assert_eq!(state.submit("octocat"), Transition::Ok);
        assert!(state.is_loading());
        assert_eq!(state.resolve(model("octocat")), Transition::Ok);
        assert_eq!(state.model().map(|m| m.username.clone()), Some("octocat".into()));
    }

    #[test]
    fn test_blank_submit_ignored() {
        let mut state = RequestState::new();
        assert_eq!(state.submit("   "), Transition::Ignored);
        assert_eq!(state, RequestState::Idle);
    }

    #[test]
    fn test_submit_while_loading_ignored() {
        let mut state = RequestState::new();
        state.submit("octocat");
        assert_eq!(state.submit("hubot"), Transition::Ignored);
        assert_eq!(
            state,
            RequestState::Loading {
                username: "octocat".into()
            }
        );
    }

    #[test]
    fn test_resolve_without_request_ignored() {
        let mut state = RequestState::new();
        assert_eq!(state.resolve(model("octocat")), Transition::Ignored);
        assert_eq!(state, RequestState::Idle);
    }

    #[test]
    fn test_stale_response_ignored() {
        let mut state = RequestState::new();
        state.submit("octocat");
        assert_eq!(state.resolve(model("hubot")), Transition::Ignored);
        assert!(state.is_loading());
    }

    #[test]
    fn test_reject() {
        let mut state = RequestState::new();
        state.submit("ghost");
        let err = FetchError::UserNotFound("ghost".into());
        assert_eq!(state.reject(&err), Transition::Ok);
        assert_eq!(state.error(), Some("user \"ghost\" not found"));
        assert_eq!(
            state,
            RequestState::Failed {
                message: "user \"ghost\" not found".into()
            }
        );
        assert_eq!(state.reject(&err), Transition::Ignored);
    }

    #[test]
    fn test_resubmit_after_failure() {
        let mut state = RequestState::Failed {
            message: "boom".into(),
        };
        assert_eq!(state.submit("octocat"), Transition::Ok);
        assert!(state.is_loading());
        assert_eq!(state.model(), None);
    }
}
