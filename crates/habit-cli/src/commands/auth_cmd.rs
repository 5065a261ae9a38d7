use crate::auth::{clear_stored_session, load_stored_session, SupabaseAuthService};
use crate::cli::AuthCommands;
use crate::commands::common::resolve_supabase_config;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::SignIn => {
            let (profile_name, supabase) = resolve_supabase_config(global_profile)?;
            let service = SupabaseAuthService::new(&profile_name, &supabase)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let session = service.ensure_session().await.map_err(CliError::Connect)?;
            println!(
                "Profile '{}' is signed in as {}",
                profile_name, session.user.id
            );
            Ok(())
        }
        AuthCommands::Status => {
            let (profile_name, supabase) = match resolve_supabase_config(global_profile) {
                Ok(resolved) => resolved,
                Err(CliError::NotConfigured) => {
                    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
                    let profile_name = config.resolve_profile_name(global_profile);
                    println!("Profile '{profile_name}' is not configured.");
                    return Ok(());
                }
                Err(error) => return Err(error),
            };

            let service = SupabaseAuthService::new(&profile_name, &supabase)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let Some(session) = service
                .restore_session()
                .await
                .map_err(|error| CliError::Auth(error.to_string()))?
            else {
                println!("Profile '{profile_name}' is not signed in.");
                return Ok(());
            };

            let user = service
                .current_user(&session.access_token)
                .await
                .map_err(CliError::Connect)?;
            match user {
                Some(user) => {
                    let kind = if user.is_anonymous {
                        "anonymous user"
                    } else {
                        "user"
                    };
                    println!(
                        "Profile '{}' is signed in as {} {} (expires_at={})",
                        profile_name, kind, user.id, session.expires_at
                    );
                }
                None => println!(
                    "Profile '{profile_name}' has a stored session the server no longer accepts."
                ),
            }
            Ok(())
        }
        AuthCommands::Logout => {
            let config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = config.resolve_profile_name(global_profile);
            let stored_session = load_stored_session(&profile_name)
                .map_err(|error| CliError::Auth(error.to_string()))?;

            match (resolve_supabase_config(global_profile).ok(), stored_session) {
                (Some((_, supabase)), Some(session)) => {
                    SupabaseAuthService::new(&profile_name, &supabase)
                        .map_err(|error| CliError::Auth(error.to_string()))?
                        .sign_out(&session.access_token)
                        .await
                        .map_err(|error| CliError::Auth(error.to_string()))?;
                }
                _ => clear_stored_session(&profile_name)
                    .map_err(|error| CliError::Auth(error.to_string()))?,
            }

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}
