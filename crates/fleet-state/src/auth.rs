//! Session reducer

use fleet_protocol::{LoginResponse, TokenPair};
use storage::{Organization, User, UserPatch};

use crate::store::Reducer;

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub organization: Option<Organization>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Default for AuthState {
    /// Loading and unauthenticated until the stored session is checked
    fn default() -> Self {
        Self {
            user: None,
            organization: None,
            is_authenticated: false,
            is_loading: true,
            error: None,
            token: None,
            refresh_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    LoginStart,
    LoginSuccess(Box<LoginResponse>),
    LoginFailure(String),
    Logout,
    RefreshToken(TokenPair),
    ClearError,
    SetLoading(bool),
    UpdateUser(UserPatch),
}

impl AuthState {
    pub fn reduce(self, action: AuthAction) -> Self {
        match action {
            AuthAction::LoginStart => Self {
                is_loading: true,
                error: None,
                ..self
            },
            AuthAction::LoginSuccess(response) => {
                let LoginResponse {
                    user,
                    organization,
                    token,
                    refresh_token,
                } = *response;
                Self {
                    user: Some(user),
                    organization: Some(organization),
                    token: Some(token),
                    refresh_token: Some(refresh_token),
                    is_authenticated: true,
                    is_loading: false,
                    error: None,
                }
            }
            AuthAction::LoginFailure(message) => Self {
                user: None,
                organization: None,
                token: None,
                refresh_token: None,
                is_authenticated: false,
                is_loading: false,
                error: Some(message),
            },
            AuthAction::Logout => Self {
                is_loading: false,
                ..Self::default()
            },
            AuthAction::RefreshToken(pair) => Self {
                token: Some(pair.token),
                refresh_token: Some(pair.refresh_token),
                error: None,
                ..self
            },
            AuthAction::ClearError => Self { error: None, ..self },
            AuthAction::SetLoading(is_loading) => Self { is_loading, ..self },
            AuthAction::UpdateUser(patch) => {
                let mut next = self;
                if let Some(user) = next.user.as_mut() {
                    user.apply(&patch);
                }
                next
            }
        }
    }

    /// Current token pair, when both tokens are held
    pub fn tokens(&self) -> Option<TokenPair> {
        match (&self.token, &self.refresh_token) {
            (Some(token), Some(refresh_token)) => Some(TokenPair {
                token: token.clone(),
                refresh_token: refresh_token.clone(),
            }),
            _ => None,
        }
    }
}

impl Reducer for AuthState {
    type Action = AuthAction;

    fn reduce(self, action: AuthAction) -> Self {
        AuthState::reduce(self, action)
    }
}
