use habit_core::config::{SupabaseConfig, ANON_KEY_ENV_VARS, URL_ENV_VARS};
use habit_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            request_timeout_secs,
            no_activate,
        } => {
            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(global_profile);
            let env = SupabaseConfig::from_env().ok().flatten();

            let profile = config.profile_mut_or_default(&profile_name);
            merge_profile(
                profile,
                supabase_url,
                supabase_anon_key,
                request_timeout_secs,
                env.as_ref(),
            )?;
            let missing = missing_fields(profile);

            if !no_activate {
                config.active_profile = Some(profile_name.clone());
            }

            let path = config.save().map_err(CliError::Config)?;
            println!(
                "Profile '{}' initialized at {}",
                profile_name,
                path.display()
            );
            if missing.is_empty() {
                println!("Profile '{profile_name}' is ready. Run `habit list` to get started.");
            } else {
                println!(
                    "Profile '{}' is missing: {}",
                    profile_name,
                    missing.join(", ")
                );
            }
            Ok(())
        }
    }
}

/// Apply explicit values, then environment values, over the stored profile.
pub fn merge_profile(
    profile: &mut CliProfile,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    request_timeout_secs: Option<u64>,
    env: Option<&SupabaseConfig>,
) -> Result<(), CliError> {
    if let Some(url) = normalize_text_option(supabase_url)
        .or_else(|| env.map(|config| config.url.clone()))
    {
        profile.supabase_url = Some(url);
    }
    if let Some(key) = normalize_text_option(supabase_anon_key)
        .or_else(|| env.map(|config| config.anon_key.clone()))
    {
        profile.supabase_anon_key = Some(key);
    }
    if let Some(secs) = request_timeout_secs {
        if secs == 0 {
            return Err(CliError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        profile.request_timeout_secs = Some(secs);
    }

    validate_profile(profile)
}

fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.supabase_url() {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}

pub fn missing_fields(profile: &CliProfile) -> Vec<String> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push(format!("supabase_url (or {})", URL_ENV_VARS[0]));
    }
    if profile.supabase_anon_key().is_none() {
        missing.push(format!("supabase_anon_key (or {})", ANON_KEY_ENV_VARS[0]));
    }
    missing
}
