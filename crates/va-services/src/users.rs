//! Accounts: registration, email verification, login and password reset

use chrono::Utc;
use va_auth::{hash_code, hash_password, verify_password, IssuedCode, JwtError};
use va_contracts::users::{
    EmailContract, EmailInput, LoginContract, LoginInput, RegisterContract, RegisterInput,
    ResetPasswordContract, ResetPasswordInput, TokenContract, TokenInput, UpdateUserContract,
    UpdateUserInput,
};
use va_contracts::Contract;
use va_core::{Id, VaError, VaResult};
use va_models::User;

use crate::context::ServiceContext;

/// A signed-in user and their session token
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

fn token_error(err: JwtError) -> VaError {
    VaError::internal(err.to_string())
}

pub struct UserService {
    ctx: ServiceContext,
}

impl UserService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    fn session(&self, user: User) -> VaResult<Session> {
        let token = self
            .ctx
            .jwt
            .create_token(user.id, self.ctx.auth.token_ttl_seconds)
            .map_err(token_error)?;
        Ok(Session { user, token })
    }

    pub async fn register(&self, input: RegisterInput) -> VaResult<User> {
        RegisterContract.validate(&input)?;
        let email = input.email.unwrap_or_default().trim().to_lowercase();
        let user_name = input.user_name.unwrap_or_default().trim().to_string();

        let users = &self.ctx.stores.users;
        if users.find_by_email(&email).await?.is_some() {
            return Err(VaError::bad_request("Email already exists"));
        }
        if users.find_by_user_name(&user_name).await?.is_some() {
            return Err(VaError::bad_request("Username already exists"));
        }

        let code = IssuedCode::new(self.ctx.auth.code_ttl_seconds);
        let user = User {
            id: uuid::Uuid::new_v4(),
            user_name,
            email,
            password_hash: hash_password(input.password.as_deref().unwrap_or_default())?,
            full_name: input.full_name.unwrap_or_default().trim().to_string(),
            verify_token: Some(code.hashed.clone()),
            verify_token_expiry: Some(code.expires_at),
            reset_token: None,
            reset_token_expiry: None,
            verified: false,
            created_at: Utc::now(),
        };
        let user = users.create(user).await?;
        tracing::info!(user_id = %user.id, "User registered");

        self.ctx
            .deliver(self.ctx.templates.verification_code(&user.email, &code.code))
            .await;
        Ok(user)
    }

    pub async fn verify_email(&self, input: TokenInput) -> VaResult<Session> {
        TokenContract.validate(&input)?;
        let hashed = hash_code(&input.code().unwrap_or_default());

        let mut user = self
            .ctx
            .stores
            .users
            .find_by_verify_token(&hashed)
            .await?
            .filter(|u| u.verify_token_valid(&hashed, Utc::now()))
            .ok_or_else(|| VaError::bad_request("Invalid or expired token"))?;

        user.verified = true;
        user.verify_token = None;
        user.verify_token_expiry = None;
        let user = self.ctx.stores.users.update(&user).await?;
        self.session(user)
    }

    pub async fn login(&self, input: LoginInput) -> VaResult<Session> {
        LoginContract.validate(&input)?;
        let email = input.email.unwrap_or_default().trim().to_lowercase();
        let password = input.password.unwrap_or_default();

        let user = self.ctx.stores.users.find_by_email(&email).await?;
        match user {
            Some(user) if verify_password(&password, &user.password_hash) => {
                tracing::debug!(user_id = %user.id, "Login succeeded");
                self.session(user)
            }
            _ => Err(VaError::bad_request("Invalid email or password")),
        }
    }

    pub async fn request_password_reset(&self, input: EmailInput) -> VaResult<()> {
        EmailContract.validate(&input)?;
        let email = input.email.unwrap_or_default().trim().to_lowercase();

        let mut user = self
            .ctx
            .stores
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| VaError::not_found("User not found"))?;

        let code = IssuedCode::new(self.ctx.auth.code_ttl_seconds);
        user.reset_token = Some(code.hashed.clone());
        user.reset_token_expiry = Some(code.expires_at);
        let user = self.ctx.stores.users.update(&user).await?;

        self.ctx
            .deliver(self.ctx.templates.password_reset_code(&user.email, &code.code))
            .await;
        Ok(())
    }

    /// Exchange a valid reset code for a short-lived reset token
    pub async fn confirm_reset_token(&self, input: TokenInput) -> VaResult<String> {
        let Some(code) = input.code() else {
            return Err(VaError::invalid("Token required"));
        };
        let hashed = hash_code(&code);

        let user = self
            .ctx
            .stores
            .users
            .find_by_reset_token(&hashed)
            .await?
            .filter(|u| u.reset_token_valid(&hashed, Utc::now()))
            .ok_or_else(|| VaError::bad_request("Invalid or expired token"))?;

        self.ctx
            .jwt
            .create_reset_token(user.id, &user.email, self.ctx.auth.reset_token_ttl_seconds)
            .map_err(token_error)
    }

    pub async fn reset_password(
        &self,
        reset_token: Option<&str>,
        input: ResetPasswordInput,
    ) -> VaResult<()> {
        let token = reset_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| VaError::unauthorized("Unauthorized. Token missing."))?;
        let (user_id, _) = self
            .ctx
            .jwt
            .validate_reset_token(token)
            .map_err(|_| VaError::unauthorized("Invalid or expired token"))?;
        ResetPasswordContract.validate(&input)?;

        let mut user = self.ctx.current_user(user_id).await?;
        user.password_hash = hash_password(input.password.as_deref().unwrap_or_default())?;
        user.reset_token = None;
        user.reset_token_expiry = None;
        self.ctx.stores.users.update(&user).await?;
        tracing::info!(%user_id, "Password reset");
        Ok(())
    }

    pub async fn get(&self, user_id: Id) -> VaResult<User> {
        self.ctx.current_user(user_id).await
    }

    pub async fn update(&self, user_id: Id, input: UpdateUserInput) -> VaResult<User> {
        UpdateUserContract.validate(&input)?;
        let mut user = self.ctx.current_user(user_id).await?;

        if let Some(user_name) = input.user_name {
            user.user_name = user_name.trim().to_string();
        }
        if let Some(full_name) = input.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(email) = input.email {
            user.email = email.trim().to_lowercase();
        }
        if let Some(password) = input.password.filter(|p| !p.is_empty()) {
            user.password_hash = hash_password(&password)?;
        }
        self.ctx.stores.users.update(&user).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn register_input(user_name: &str, email: &str) -> RegisterInput {
        RegisterInput {
            user_name: Some(user_name.into()),
            email: Some(email.into()),
            password: Some("s3cret-pass".into()),
            full_name: Some("Jane Doe".into()),
        }
    }

    fn code_from(body: &str) -> String {
        body.split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_ascii_digit()))
            .find(|w| w.len() == 6)
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_register_sends_code_and_verifies() {
        let t = TestContext::new();
        let service = UserService::new(t.ctx.clone());

        let user = service
            .register(register_input("jane", "Jane@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert!(!user.verified);

        let sent = t.emails.sent_to("jane@example.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Verify your email");

        let code = code_from(&sent[0].text_body);
        let session = service
            .verify_email(TokenInput {
                token: Some(serde_json::json!(code)),
            })
            .await
            .unwrap();
        assert!(session.user.verified);
        assert_eq!(t.ctx.jwt.get_user_id(&session.token).unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_register_duplicates() {
        let t = TestContext::new();
        let service = UserService::new(t.ctx.clone());
        service.register(register_input("jane", "jane@example.com")).await.unwrap();

        let err = service
            .register(register_input("other", "jane@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already exists");

        let err = service
            .register(register_input("jane", "new@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Username already exists");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_code() {
        let t = TestContext::new();
        let service = UserService::new(t.ctx.clone());
        let err = service
            .verify_email(TokenInput {
                token: Some(serde_json::json!(123456)),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_login() {
        let t = TestContext::new();
        let service = UserService::new(t.ctx.clone());
        service.register(register_input("jane", "jane@example.com")).await.unwrap();

        let session = service
            .login(LoginInput {
                email: Some("JANE@example.com".into()),
                password: Some("s3cret-pass".into()),
            })
            .await
            .unwrap();
        assert_eq!(session.user.user_name, "jane");

        let err = service
            .login(LoginInput {
                email: Some("jane@example.com".into()),
                password: Some("wrong".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let t = TestContext::new();
        let service = UserService::new(t.ctx.clone());
        service.register(register_input("jane", "jane@example.com")).await.unwrap();

        service
            .request_password_reset(EmailInput {
                email: Some("jane@example.com".into()),
            })
            .await
            .unwrap();
        let mail = t
            .emails
            .sent()
            .into_iter()
            .find(|m| m.subject == "Reset your password")
            .unwrap();

        let reset_token = service
            .confirm_reset_token(TokenInput {
                token: Some(serde_json::json!(code_from(&mail.text_body))),
            })
            .await
            .unwrap();

        service
            .reset_password(
                Some(&reset_token),
                ResetPasswordInput {
                    password: Some("brand-new".into()),
                },
            )
            .await
            .unwrap();

        let session = service
            .login(LoginInput {
                email: Some("jane@example.com".into()),
                password: Some("brand-new".into()),
            })
            .await
            .unwrap();
        assert!(session.user.reset_token.is_none());
    }

    #[tokio::test]
    async fn test_reset_requires_token() {
        let t = TestContext::new();
        let service = UserService::new(t.ctx.clone());
        let err = service
            .reset_password(None, ResetPasswordInput { password: Some("x".into()) })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.to_string(), "Unauthorized. Token missing.");
    }

    #[tokio::test]
    async fn test_unknown_email_reset() {
        let t = TestContext::new();
        let service = UserService::new(t.ctx.clone());
        let err = service
            .request_password_reset(EmailInput {
                email: Some("ghost@example.com".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_update_user() {
        let t = TestContext::new();
        let service = UserService::new(t.ctx.clone());
        let user = t.user("jane", "Jane Doe").await;

        let updated = service
            .update(
                user.id,
                UpdateUserInput {
                    full_name: Some("Jane Roe".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Jane Roe");

        let err = service.update(user.id, UpdateUserInput::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "At least one field is required to update");
    }
}
