use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::controller::ControllerSettings;

pub const API_URL_ENV: &str =
  "FOCUSFLOW_API_URL";
pub const RCFILE_ENV: &str =
  "FOCUSFLOWRC";

const DEFAULT_API_URL: &str =
  "http://localhost:4000";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (k, v) in [
      ("api.url", DEFAULT_API_URL),
      ("api.timeout", "30"),
      ("search.debounce", "300"),
      ("refresh.discard_stale", "off"),
      (
        "session.location",
        "~/.focusflow/session.json"
      ),
      ("color", "on")
    ] {
      map.insert(
        k.to_string(),
        v.to_string()
      );
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rcfile_override
  ))]
  pub fn load(
    rcfile_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rcfile = resolve_rcfile_path(
      rcfile_override
    )?;
    if let Some(path) = rcfile {
      info!(rcfile = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no rc file found; using \
         defaults"
      );
    }

    if let Ok(url) =
      std::env::var(API_URL_ENV)
      && !url.trim().is_empty()
    {
      debug!(url = %url, "api url taken from environment");
      cfg.map.insert(
        "api.url".to_string(),
        url.trim().to_string()
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
      .transpose()
      .with_context(|| {
        format!("invalid value for {key}")
      })
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u64>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<u64>().map_err(
          |err| {
            anyhow!(
              "invalid value for \
               {key}: '{v}' ({err})"
            )
          }
        )
      })
      .transpose()
  }

  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let mut chain = Vec::new();
    self.load_file_chained(
      path, &mut chain
    )
  }

  /// `chain` holds the canonical paths
  /// of the files currently being
  /// included, outermost first.
  #[tracing::instrument(skip(
    self, chain
  ))]
  fn load_file_chained(
    &mut self,
    path: &Path,
    chain: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let canonical =
      fs::canonicalize(&path)
        .with_context(|| {
          format!(
            "failed to resolve {}",
            path.display()
          )
        })?;
    if chain.contains(&canonical) {
      return Err(anyhow!(
        "include cycle at {}",
        path.display()
      ));
    }
    chain.push(canonical);

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }
      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self.load_file_chained(
            &include_path,
            chain
          )?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    chain.pop();
    Ok(())
  }
}

/// Typed view of the keys the client reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
  pub api_url:          String,
  pub request_timeout:  Duration,
  pub search_debounce:  Duration,
  pub discard_stale:    bool,
  pub session_location: PathBuf,
  pub color:            bool
}

impl ClientSettings {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let api_url = cfg
      .get("api.url")
      .filter(|u| !u.trim().is_empty())
      .unwrap_or_else(|| {
        DEFAULT_API_URL.to_string()
      });

    let timeout_secs = cfg
      .get_u64("api.timeout")?
      .unwrap_or(30);
    if timeout_secs == 0 {
      return Err(anyhow!(
        "api.timeout must be at least \
         1 second"
      ));
    }

    let debounce_ms = cfg
      .get_u64("search.debounce")?
      .unwrap_or(300);

    let session_location = match cfg
      .get("session.location")
    {
      | Some(p) => {
        expand_tilde(Path::new(&p))
      }
      | None => default_session_path()?
    };

    let settings = Self {
      api_url,
      request_timeout: Duration::from_secs(
        timeout_secs
      ),
      search_debounce: Duration::from_millis(
        debounce_ms
      ),
      discard_stale: cfg
        .get_bool(
          "refresh.discard_stale"
        )?
        .unwrap_or(false),
      session_location,
      color: cfg
        .get_bool("color")?
        .unwrap_or(true)
    };
    debug!(?settings, "resolved client settings");
    Ok(settings)
  }

  pub fn controller(
    &self
  ) -> ControllerSettings {
    ControllerSettings {
      search_debounce: self
        .search_debounce,
      discard_stale:   self
        .discard_stale
    }
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rcfile_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RCFILE_ENV)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    return Ok(None);
  };
  let candidate =
    home.join(".focusflowrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_session_path()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(
    home
      .join(".focusflow")
      .join("session.json")
  )
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(
  s: &str
) -> anyhow::Result<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Ok(true),
    | "0" | "n" | "no" | "off"
    | "false" => Ok(false),
    | other => Err(anyhow!(
      "expected on/off, got '{other}'"
    ))
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn defaults_resolve_to_settings() {
    let settings =
      ClientSettings::from_config(
        &Config::default()
      )
      .expect("settings");
    assert_eq!(
      settings.api_url,
      DEFAULT_API_URL
    );
    assert_eq!(
      settings.search_debounce,
      Duration::from_millis(300)
    );
    assert_eq!(
      settings.request_timeout,
      Duration::from_secs(30)
    );
    assert!(!settings.discard_stale);
    assert!(settings.color);
    assert_eq!(
      settings.controller(),
      ControllerSettings::default()
    );
  }

  #[test]
  fn rc_file_with_include_and_comments()
  {
    let temp =
      tempdir().expect("tempdir");
    let extra =
      temp.path().join("extra.rc");
    fs::write(
      &extra,
      "search.debounce = 150\n"
    )
    .expect("write include");

    let main = temp.path().join("main.rc");
    fs::write(
      &main,
      "# client settings\n\
       api.url = https://tasks.example.test/api  # trailing\n\
       \n\
       include extra.rc\n\
       refresh.discard_stale = yes\n"
    )
    .expect("write rc");

    let mut cfg = Config::default();
    cfg
      .load_file(&main)
      .expect("load rc");
    assert_eq!(cfg.loaded_files.len(), 2);

    let settings =
      ClientSettings::from_config(&cfg)
        .expect("settings");
    assert_eq!(
      settings.api_url,
      "https://tasks.example.test/api"
    );
    assert_eq!(
      settings.search_debounce,
      Duration::from_millis(150)
    );
    assert!(settings.discard_stale);
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![
      (
        "rc.color".to_string(),
        "off".to_string()
      ),
      (
        "api.timeout".to_string(),
        "5".to_string()
      ),
    ]);
    let settings =
      ClientSettings::from_config(&cfg)
        .expect("settings");
    assert!(!settings.color);
    assert_eq!(
      settings.request_timeout,
      Duration::from_secs(5)
    );
  }

  #[test]
  fn malformed_values_are_rejected() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "search.debounce".to_string(),
      "soon".to_string()
    )]);
    assert!(
      ClientSettings::from_config(&cfg)
        .is_err()
    );

    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "refresh.discard_stale"
        .to_string(),
      "maybe".to_string()
    )]);
    assert!(
      ClientSettings::from_config(&cfg)
        .is_err()
    );

    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "api.timeout".to_string(),
      "0".to_string()
    )]);
    assert!(
      ClientSettings::from_config(&cfg)
        .is_err()
    );
  }

  #[test]
  fn self_include_is_a_cycle_error() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("loop.rc");
    fs::write(
      &rc,
      format!(
        "color = off\ninclude {}\n",
        rc.display()
      )
    )
    .expect("write rc");

    let err = Config::load(Some(rc.as_path()))
      .expect_err("cycle");
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );
  }

  #[test]
  fn mutual_includes_are_rejected_but_shared_ones_load()
  {
    let temp =
      tempdir().expect("tempdir");
    let a = temp.path().join("a.rc");
    let b = temp.path().join("b.rc");
    fs::write(&a, "include b.rc\n")
      .expect("write a");
    fs::write(&b, "include a.rc\n")
      .expect("write b");
    let mut cfg = Config::default();
    assert!(cfg.load_file(&a).is_err());

    let common =
      temp.path().join("common.rc");
    let main = temp.path().join("main.rc");
    fs::write(
      &common,
      "search.debounce = 120\n"
    )
    .expect("write common");
    fs::write(
      &b,
      "include common.rc\n"
    )
    .expect("rewrite b");
    fs::write(
      &main,
      "include common.rc\ninclude b.rc\n"
    )
    .expect("write main");

    let mut cfg = Config::default();
    cfg
      .load_file(&main)
      .expect("diamond include");
    assert_eq!(cfg.loaded_files.len(), 4);
    assert_eq!(
      cfg.get("search.debounce").as_deref(),
      Some("120")
    );
  }

  #[test]
  fn line_without_equals_is_an_error() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("bad.rc");
    fs::write(&rc, "api.url\n")
      .expect("write rc");
    let mut cfg = Config::default();
    assert!(cfg.load_file(&rc).is_err());
  }
}
