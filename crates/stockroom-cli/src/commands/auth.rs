use stockroom_core::config::SyncSettings;
use stockroom_core::remote::ApiClient;

use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Login {
            profile,
            email,
            password,
        } => run_login(profile.as_deref().or(global_profile), &email, &password).await,
        AuthCommands::Status { profile } => {
            run_auth_status(profile.as_deref().or(global_profile))
        }
        AuthCommands::Logout { profile } => run_logout(profile.as_deref().or(global_profile)).await,
    }
}

async fn run_login(profile: Option<&str>, email: &str, password: &str) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(profile);
    let client = api_client(&config.effective_settings(Some(&profile_name)))?
        .ok_or(CliError::SyncNotConfigured)?;

    let session = client.login(email, password).await?;
    store_token(&mut config, &profile_name, session.token);
    config.save()?;

    println!("Signed in profile '{profile_name}' as {}", session.email);
    Ok(())
}

fn run_auth_status(profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(profile);
    let signed_in = config
        .profile(&profile_name)
        .is_some_and(|settings| settings.api_token.is_some());

    if signed_in {
        println!("Profile '{profile_name}' has a stored API token");
    } else {
        println!("Profile '{profile_name}' is not signed in");
    }
    Ok(())
}

/// Revokes the token remotely when possible; the local copy is always cleared
async fn run_logout(profile: Option<&str>) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(profile);
    let settings = config.effective_settings(Some(&profile_name));

    if settings.api_token.is_some() {
        if let Some(client) = api_client(&settings)? {
            if let Err(error) = client.logout().await {
                tracing::warn!("Could not revoke token remotely, clearing it locally: {error}");
            }
        }
    }

    if clear_token(&mut config, &profile_name) {
        config.save()?;
    }
    println!("Signed out profile '{profile_name}'");
    Ok(())
}

fn api_client(settings: &SyncSettings) -> Result<Option<ApiClient>, CliError> {
    Ok(settings
        .remote()?
        .map(|remote| ApiClient::new(&remote))
        .transpose()?)
}

pub fn store_token(config: &mut CliProfilesConfig, profile_name: &str, token: String) {
    config.profile_mut_or_default(profile_name).api_token = Some(token);
}

/// Returns whether a token was stored
pub fn clear_token(config: &mut CliProfilesConfig, profile_name: &str) -> bool {
    config
        .profiles
        .get_mut(profile_name)
        .and_then(|settings| settings.api_token.take())
        .is_some()
}
