use crate::{
    auth::{Claims, hash_password, verify_password},
    config::Config,
    error::{AppError, Result},
    models::{LoginRequest, SignupRequest, User},
    store::UserStore,
};

pub async fn signup(
    store: &dyn UserStore,
    config: &Config,
    request: SignupRequest,
) -> Result<String> {
    if store.find_user_by_email(&request.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = hash_password(&request.password, config.bcrypt_cost)?;
    let user = User::new(request.name, request.email, password_hash);
    store.insert_user(&user).await?;

    tracing::info!(user_id = %user.id, "User signed up");

    Claims::issue(&user, &config.jwt_secret, config.jwt_expires_in_hours)
}

pub async fn login(
    store: &dyn UserStore,
    config: &Config,
    request: LoginRequest,
) -> Result<String> {
    let user = store
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(|| AppError::NotFound("Email not registered".to_string()))?;

    if !verify_password(&request.password, &user.password)? {
        return Err(AppError::BadRequest("Incorrect password".to_string()));
    }

    Claims::issue(&user, &config.jwt_secret, config.jwt_expires_in_hours)
}
