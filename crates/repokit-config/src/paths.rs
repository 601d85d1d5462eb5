//! Path resolution following the XDG Base Directory Specification.

use std::{env, path::PathBuf};

use crate::error::{ConfigError, Result};

/// Returns the user's home directory from `$HOME`.
pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// `$XDG_CONFIG_HOME`, defaulting to `$HOME/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// `$XDG_DATA_HOME`, defaulting to `$HOME/.local/share`.
pub fn xdg_data_home() -> PathBuf {
    env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Resolves a path string that may contain environment variables.
///
/// `$VAR` and `${VAR}` are expanded, a leading `~` becomes the home directory
/// and relative paths are made absolute against the current directory.
///
/// # Errors
///
/// * [`ConfigError::EmptyPath`] if the path is empty
/// * [`ConfigError::MissingEnvVar`] if a referenced variable is undefined
/// * [`ConfigError::UnclosedVariable`] for `${` without a closing brace
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let path = path.trim();

    if path.is_empty() {
        return Err(ConfigError::EmptyPath);
    }

    let path_buf = PathBuf::from(expand_variables(path)?);
    if path_buf.is_absolute() {
        Ok(path_buf)
    } else {
        Ok(env::current_dir()?.join(path_buf))
    }
}

fn expand_variables(path: &str) -> Result<String> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let var_name = consume_until(&mut chars, '}')?;
                    expand_env_var(&var_name, &mut result, path)?;
                } else {
                    let var_name = consume_var_name(&mut chars);
                    if var_name.is_empty() {
                        result.push('$');
                    } else {
                        expand_env_var(&var_name, &mut result, path)?;
                    }
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn consume_until(chars: &mut std::iter::Peekable<std::str::Chars>, delimiter: char) -> Result<String> {
    let mut var_name = String::new();

    for c in chars.by_ref() {
        if c == delimiter {
            return Ok(var_name);
        }
        var_name.push(c);
    }

    Err(ConfigError::UnclosedVariable {
        input: format!("${{{var_name}"),
    })
}

fn consume_var_name(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut var_name = String::new();

    while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
        var_name.push(c);
    }

    var_name
}

fn expand_env_var(var_name: &str, result: &mut String, original: &str) -> Result<()> {
    match var_name {
        "HOME" => result.push_str(&home_dir().to_string_lossy()),
        "XDG_CONFIG_HOME" => result.push_str(&xdg_config_home().to_string_lossy()),
        "XDG_DATA_HOME" => result.push_str(&xdg_data_home().to_string_lossy()),
        _ => {
            let value = env::var(var_name).map_err(|_| ConfigError::MissingEnvVar {
                input: original.into(),
                var: var_name.into(),
            })?;
            result.push_str(&value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_expand_variables() {
        env::set_var("REPOKIT_TEST_VAR", "test_value");

        assert_eq!(
            expand_variables("$REPOKIT_TEST_VAR/path").unwrap(),
            "test_value/path"
        );
        assert_eq!(
            expand_variables("${REPOKIT_TEST_VAR}/path").unwrap(),
            "test_value/path"
        );
        assert_eq!(expand_variables("cost$").unwrap(), "cost$");

        env::remove_var("REPOKIT_TEST_VAR");
    }

    #[test]
    #[serial]
    fn test_expand_variables_errors() {
        assert!(matches!(
            expand_variables("${REPOKIT_TEST_VAR"),
            Err(ConfigError::UnclosedVariable { .. })
        ));
        assert!(matches!(
            expand_variables("$THIS_VAR_DOESNT_EXIST"),
            Err(ConfigError::MissingEnvVar { .. })
        ));
        assert!(matches!(resolve_path("  "), Err(ConfigError::EmptyPath)));
    }

    #[test]
    #[serial]
    fn test_xdg_directories() {
        let home = env::var("HOME").ok();
        env::set_var("HOME", "/tmp/home");
        env::remove_var("XDG_CONFIG_HOME");
        env::remove_var("XDG_DATA_HOME");

        assert_eq!(xdg_config_home(), PathBuf::from("/tmp/home/.config"));
        assert_eq!(xdg_data_home(), PathBuf::from("/tmp/home/.local/share"));
        assert_eq!(
            resolve_path("~/repokit.db").unwrap(),
            PathBuf::from("/tmp/home/repokit.db")
        );

        env::set_var("XDG_DATA_HOME", "/tmp/data");
        assert_eq!(
            resolve_path("$XDG_DATA_HOME/repokit").unwrap(),
            PathBuf::from("/tmp/data/repokit")
        );
        env::remove_var("XDG_DATA_HOME");

        match home {
            Some(home) => env::set_var("HOME", home),
            None => env::remove_var("HOME"),
        }
    }

    #[test]
    #[serial]
    fn test_relative_paths_are_absolute() {
        let resolved = resolve_path("data/repokit.db").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("data/repokit.db"));
    }
}
