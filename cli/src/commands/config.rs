use depexec_core::api as core_api;

pub fn handle_config(cfg: &core_api::AppConfig) -> Result<i32, core_api::CliError> {
    let rendered = toml::to_string_pretty(cfg)
        .map_err(|e| core_api::CliError::Config(e.to_string()))?;
    print!("{}", rendered);
    Ok(0)
}
