use stockroom_core::config::SyncSettings;
use stockroom_core::sync::RefreshPolicy;
use stockroom_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Field values given to `config init`; `None` keeps the stored value
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
    pub refresh_policy: Option<RefreshPolicy>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            api_token,
            request_timeout_secs,
            sweep_interval_secs,
            refresh_policy,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileUpdate {
                api_base_url,
                api_token,
                request_timeout_secs,
                sweep_interval_secs,
                refresh_policy: refresh_policy.map(Into::into),
            },
            no_activate,
        ),
        ConfigCommands::Show { profile } => {
            run_config_show(profile.as_deref().or(global_profile))
        }
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    update: ProfileUpdate,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(profile_name);

    let settings = config.profile_mut_or_default(&profile_name);
    apply_profile_update(settings, update);
    // Rejects malformed URLs and zero timeouts before anything is written
    settings.remote()?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save()?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let has_api = config
        .profile(&profile_name)
        .and_then(|settings| settings.api_base_url.as_deref())
        .is_some();
    if has_api {
        println!("Profile '{profile_name}' is ready. Run `stock sync` to push local changes.");
    } else {
        println!("Profile '{profile_name}' has no api_base_url; working local only");
    }
    Ok(())
}

pub fn apply_profile_update(settings: &mut SyncSettings, update: ProfileUpdate) {
    if let Some(url) = normalize_text_option(update.api_base_url) {
        settings.api_base_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(token) = normalize_text_option(update.api_token) {
        settings.api_token = Some(token);
    }
    if let Some(secs) = update.request_timeout_secs {
        settings.request_timeout_secs = secs;
    }
    if let Some(secs) = update.sweep_interval_secs {
        settings.sweep_interval_secs = secs;
    }
    if let Some(policy) = update.refresh_policy {
        settings.refresh_policy = policy;
    }
}

pub fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load()?;
    let name = config.resolve_profile_name(profile_name);
    let settings = config.effective_settings(Some(&name));

    println!("Profile: {name}");
    println!("{}", serde_json::to_string_pretty(&redacted(&settings))?);
    Ok(())
}

/// Settings as JSON with the token masked
pub fn redacted(settings: &SyncSettings) -> SyncSettings {
    SyncSettings {
        api_token: settings.api_token.as_ref().map(|_| "[REDACTED]".to_string()),
        ..settings.clone()
    }
}
