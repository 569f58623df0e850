//! `digitall export` -- write or print the profile once it validates.

use std::io::Write;
use std::path::{Path, PathBuf};

use digitall_core::{AccountSnapshot, ExportGate};
use tracing::info;

use crate::cli::{ExportArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: ExportArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::effective_config(global)?;
    let resolver = config::build_resolver(&cfg)?;
    let params = util::target_params(&args.url)?;
    let snapshot = util::resolve_once(&resolver, &params, &cfg, global.quiet).await?;

    let export = |e| CliError::from_core(e, cfg.locale(), &cfg.api_base);
    if args.stdout {
        let text = ExportGate::new(&snapshot).profile().map_err(export)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }

    let path = write_profile(&snapshot, &args.out).map_err(|e| match e {
        WriteError::Blocked(core) => export(core),
        WriteError::Io(io) => CliError::Io(io),
    })?;
    output::print_output(&path.display().to_string(), global.quiet);
    Ok(())
}

#[derive(Debug)]
enum WriteError {
    Blocked(digitall_core::CoreError),
    Io(std::io::Error),
}

/// Write the raw profile to `<dir>/<safe filename>`; refused while invalid.
fn write_profile(snapshot: &AccountSnapshot, dir: &Path) -> Result<PathBuf, WriteError> {
    let gate = ExportGate::new(snapshot);
    let text = gate.profile().map_err(WriteError::Blocked)?;

    std::fs::create_dir_all(dir).map_err(WriteError::Io)?;
    let path = dir.join(gate.filename());
    std::fs::write(&path, text).map_err(WriteError::Io)?;
    info!(path = %path.display(), "profile exported");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    const PROFILE: &str = "[Interface]\nPrivateKey = yAnz5TF+lXXJte14tji3zlMNq+hd2rYUIgJBgB3fBmk=\n\n[Peer]\nPublicKey = xTIBA5rboUvnH4htodjb6e697QjLERt1NAB4mZqp8Dg=\n";

    #[test]
    fn writes_raw_text_under_safe_name() {
        let snap = AccountSnapshot::from_value(json!({
            "name": "home lab",
            "clientConfig": PROFILE,
        }))
        .unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = write_profile(&snap, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("digitall-home-lab.conf"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), PROFILE);
    }

    #[test]
    fn invalid_profile_writes_nothing() {
        let snap = AccountSnapshot::from_value(json!({
            "name": "broken",
            "clientConfig": "[Interface]\nPrivateKey = short\n",
        }))
        .unwrap();
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            write_profile(&snap, dir.path()),
            Err(WriteError::Blocked(_))
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
