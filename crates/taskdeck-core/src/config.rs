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
use url::Url;

use crate::client::{
  StoreConfig,
  UpdateMethod
};
use crate::pagination::PageSize;

pub const RC_ENV_VAR: &str =
  "TASKDECKRC";
pub const DEFAULT_API_URL: &str =
  "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "api.url".to_string(),
      DEFAULT_API_URL.to_string()
    );
    map.insert(
      "api.update_method".to_string(),
      "put".to_string()
    );
    map.insert(
      "api.timeout_secs".to_string(),
      "0".to_string()
    );
    map.insert(
      "page.size".to_string(),
      PageSize::DEFAULT.to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading taskdeckrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no taskdeckrc found; using \
         defaults"
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

  pub fn api_url(
    &self
  ) -> anyhow::Result<Url> {
    let raw = self
      .get("api.url")
      .unwrap_or_else(|| {
        DEFAULT_API_URL.to_string()
      });
    let url = Url::parse(raw.trim())
      .with_context(|| {
        format!(
          "invalid api.url: {raw}"
        )
      })?;
    if !matches!(
      url.scheme(),
      "http" | "https"
    ) {
      return Err(anyhow!(
        "api.url must be http or \
         https, got {}",
        url.scheme()
      ));
    }
    Ok(url)
  }

  pub fn update_method(
    &self
  ) -> anyhow::Result<UpdateMethod> {
    self
      .get("api.update_method")
      .map(|raw| {
        raw
          .parse::<UpdateMethod>()
          .map_err(|e| anyhow!(e))
      })
      .unwrap_or(Ok(
        UpdateMethod::default()
      ))
  }

  /// `0` (the default) means no timeout.
  pub fn timeout(
    &self
  ) -> anyhow::Result<Option<Duration>>
  {
    let Some(raw) =
      self.get("api.timeout_secs")
    else {
      return Ok(None);
    };
    let secs: u64 = raw
      .trim()
      .parse()
      .with_context(|| {
        format!(
          "invalid api.timeout_secs: \
           {raw}"
        )
      })?;
    Ok(
      (secs > 0)
        .then(|| Duration::from_secs(secs))
    )
  }

  pub fn page_size(
    &self
  ) -> anyhow::Result<PageSize> {
    match self.get("page.size") {
      | Some(raw) => {
        raw.parse::<PageSize>().with_context(
          || "invalid page.size"
        )
      }
      | None => Ok(PageSize::DEFAULT)
    }
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    let Some(raw) = self.get("color")
    else {
      return Ok(true);
    };
    parse_bool(&raw).ok_or_else(|| {
      anyhow!(
        "invalid color setting: {raw}"
      )
    })
  }

  pub fn store_config(
    &self
  ) -> anyhow::Result<StoreConfig> {
    Ok(StoreConfig {
      base_url:      self.api_url()?,
      update_method: self
        .update_method()?,
      timeout:       self.timeout()?
    })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
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
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

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
        if self
          .loaded_files
          .contains(&include_path)
        {
          warn!(include = %include_path.display(), "include already loaded; skipping");
          continue;
        }
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
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

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
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
    warn!(
      "cannot determine home \
       directory; skipping \
       ~/.taskdeckrc"
    );
    return Ok(None);
  };
  let candidate =
    home.join(".taskdeckrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
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

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::*;

  #[test]
  fn defaults_point_at_local_backend() {
    let cfg = Config::default();
    assert_eq!(
      cfg
        .api_url()
        .expect("url")
        .as_str(),
      "http://localhost:5000/"
    );
    assert_eq!(
      cfg.page_size().expect("size"),
      PageSize::DEFAULT
    );
    assert_eq!(
      cfg
        .update_method()
        .expect("method"),
      UpdateMethod::Put
    );
    assert_eq!(
      cfg.timeout().expect("timeout"),
      None
    );
    assert!(cfg.color().expect("color"));
  }

  #[test]
  fn rc_file_with_include_and_comments() {
    let dir = tempdir().expect("tempdir");
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "api.update_method = patch\n"
    )
    .expect("write include");

    let rc = dir.path().join("taskdeckrc");
    fs::write(
      &rc,
      "# backend\n\
       api.url = http://tasks.internal:8080 # lan\n\
       page.size=20\n\
       include extra.rc\n\
       api.timeout_secs = 15\n"
    )
    .expect("write rc");

    let cfg =
      Config::load(Some(&rc)).expect("load");
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(
      cfg.api_url().expect("url").as_str(),
      "http://tasks.internal:8080/"
    );
    assert_eq!(
      cfg.page_size().expect("size").get(),
      20
    );
    assert_eq!(
      cfg
        .update_method()
        .expect("method"),
      UpdateMethod::Patch
    );
    assert_eq!(
      cfg.timeout().expect("timeout"),
      Some(Duration::from_secs(15))
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "rc.page.size".to_string(),
        "5".to_string()
      ),
      (
        "color".to_string(),
        "off".to_string()
      ),
    ]);
    assert_eq!(
      cfg.page_size().expect("size").get(),
      5
    );
    assert!(!cfg.color().expect("color"));
  }

  #[test]
  fn color_accepts_common_spellings() {
    for (raw, expected) in [
      ("on", true),
      ("Y", true),
      ("true", true),
      ("off", false),
      ("no", false),
      (" 0 ", false),
    ] {
      let mut cfg = Config::default();
      cfg.apply_overrides([(
        "color".to_string(),
        raw.to_string()
      )]);
      assert_eq!(
        cfg.color().expect("color"),
        expected,
        "color = {raw:?}"
      );
    }

    let mut cfg = Config::default();
    cfg.apply_overrides([(
      "color".to_string(),
      "sometimes".to_string()
    )]);
    assert!(cfg.color().is_err());
  }

  #[test]
  fn invalid_values_are_reported() {
    let mut cfg = Config::default();
    cfg.apply_overrides([
      (
        "page.size".to_string(),
        "7".to_string()
      ),
      (
        "api.url".to_string(),
        "ftp://example.test".to_string()
      ),
      (
        "api.timeout_secs".to_string(),
        "soon".to_string()
      ),
    ]);
    assert!(cfg.page_size().is_err());
    assert!(cfg.api_url().is_err());
    assert!(cfg.timeout().is_err());
    assert!(cfg.store_config().is_err());
  }

  #[test]
  fn malformed_line_names_file_and_line() {
    let dir = tempdir().expect("tempdir");
    let rc = dir.path().join("bad.rc");
    fs::write(&rc, "page.size = 10\nnonsense\n")
      .expect("write rc");

    let err = Config::load(Some(&rc))
      .expect_err("should fail");
    assert!(
      err.to_string().contains(":2:")
    );
  }
}
