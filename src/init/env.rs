use tower::BoxError;

/// Load `KEY=VALUE` pairs from an env file into the process environment.
/// Variables that are already set are left untouched.
pub fn load_file(env_file: &str) -> Result<(), BoxError> {
    let updates = load_file_updates(env_file)?;

    for (key, val) in updates {
        if std::env::var_os(&key).is_none() {
            unsafe { std::env::set_var(key, val) }
        }
    }

    Ok(())
}

fn load_file_updates(env_file: &str) -> Result<Vec<(String, String)>, BoxError> {
    let mut updates = Vec::new();
    for item in dotenvy::from_filename_iter(env_file)
        .map_err(|e| format!("failed to open env file {}: {}", env_file, e))?
    {
        let (key, val) = item.map_err(|e| format!("unable to parse line: {}", e))?;
        updates.push((key, val))
    }

    Ok(updates)
}
