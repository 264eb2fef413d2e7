//! `iconry`: administration CLI for the icon store.
//!
//! Every subcommand maps onto one store operation and prints its result as
//! JSON on stdout. Commands performed on someone's behalf take the acting
//! user with `--as`.
//!
//! # Usage
//!
//! ```
//! iconry user create --name alice --role super_admin
//! iconry --as 1 upload arrow.svg bell.svg
//! iconry --as 1 submit --repo 1 1 2
//! iconry --as 2 audit decisions.json
//! iconry --as 1 disabled set 0xe61a --mobile "iphone 5"
//! ```

mod remote;
mod settings;
mod svg;

use std::{
  io::Read as _,
  path::{Path, PathBuf},
};

use anyhow::{Context as _, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use iconry_core::{
  audit::AuditCase,
  code::parse_entity,
  icon::{IconId, ProjectId, RepoId, Role, UserId},
  store::{
    DisableRequest, IconInfoUpdate, IconStore, NewProject, NewRepo, NewUser,
    ReplaceRequest, ReplacementSubmission, SubmittedIcon,
  },
  validate::CodeDescription,
};
use iconry_store_sqlite::SqliteStore;
use remote::ProblemCodes;
use serde::Serialize;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "iconry", version, about = "Administer the iconry icon store")]
struct Cli {
  /// Path to the TOML settings file.
  #[arg(short, long, value_name = "FILE", default_value = "iconry.toml")]
  config: PathBuf,

  /// Database file; overrides the settings file.
  #[arg(long, value_name = "FILE")]
  database: Option<PathBuf>,

  /// Id of the user performing the command.
  #[arg(long = "as", value_name = "USER", env = "ICONRY_ACTOR", global = true)]
  actor: Option<i64>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  #[command(subcommand)]
  User(UserCommand),

  #[command(subcommand)]
  Repo(RepoCommand),

  #[command(subcommand)]
  Project(ProjectCommand),

  /// Upload SVG files as new icons.
  Upload {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },

  /// Upload one SVG file as a replacement candidate.
  UploadReplacement { file: PathBuf },

  /// Submit uploaded icons to a repository for audit.
  Submit {
    #[arg(long)]
    repo:       i64,
    /// Font class suffix applied to every submitted icon.
    #[arg(long)]
    font_class: Option<String>,
    #[arg(required = true)]
    ids:        Vec<i64>,
  },

  /// Put a replacement candidate forward to take over a resolved icon.
  SubmitReplacement {
    #[arg(long)]
    repo: i64,
    #[arg(long)]
    old:  i64,
    id:   i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    tags: Option<String>,
  },

  /// Delete an uploaded or rejected icon.
  Delete { id: i64 },

  /// Rename or re-tag an icon.
  Edit {
    id:   i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    tags: Option<String>,
  },

  /// Apply a batch of audit decisions read from a JSON file (`-` for stdin).
  Audit { file: PathBuf },

  /// Replace a resolved icon with a candidate immediately.
  Replace {
    #[arg(long)]
    from: i64,
    #[arg(long)]
    to:   i64,
    /// Defaults to the replaced icon's name.
    #[arg(long)]
    name: Option<String>,
    /// Defaults to the replaced icon's tags.
    #[arg(long)]
    tags: Option<String>,
    /// Adjusted outline to use instead of the uploaded one.
    #[arg(long)]
    path: Option<String>,
  },

  /// Show an icon with its repository and cached upload.
  Show { id: i64 },

  /// Show every version of the icon `id` belongs to.
  Lineage { id: i64 },

  /// List icons uploaded but not yet submitted.
  Uploaded {
    /// Defaults to the acting user.
    #[arg(long)]
    user: Option<i64>,
  },

  /// List icons awaiting audit.
  Queue,

  /// Search by keyword or by character reference (`&#xe61a;`).
  Search { query: String },

  /// List codes no icon holds.
  FreeCodes,

  /// Show audit-trail entries of a repository, or system entries.
  Logs {
    #[arg(long)]
    repo: Option<i64>,
  },

  #[command(subcommand)]
  Disabled(DisabledCommand),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
  Create {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "member")]
    role: Role,
  },
  Show { id: i64 },
}

#[derive(Subcommand, Debug)]
enum RepoCommand {
  Create {
    #[arg(long)]
    name:  String,
    #[arg(long)]
    alias: String,
    #[arg(long)]
    admin: i64,
  },
  Show { id: i64 },
  /// Release the repository's pending icons under `version`.
  Publish { id: i64, version: String },
  /// List the repository's icon links.
  Links { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
  Create {
    #[arg(long)]
    name:  String,
    #[arg(long)]
    owner: i64,
  },
  /// Add an icon to the project's pending version.
  Add { id: i64, icon: i64 },
  Links { id: i64 },
}

#[derive(Subcommand, Debug)]
enum DisabledCommand {
  /// List disabled codes in ascending order.
  List,
  /// Withhold codes from allocation, moving any icon that holds one.
  Set {
    #[arg(required = true, value_parser = parse_code)]
    codes: Vec<u32>,
    #[command(flatten)]
    description: DescriptionArgs,
    /// When the codes were found to misrender.
    #[arg(long)]
    time: Option<DateTime<Utc>>,
  },
  /// Release a disabled code.
  Unset { id: i64 },
  /// Change why a code is disabled.
  Describe {
    id: i64,
    #[command(flatten)]
    description: DescriptionArgs,
  },
  /// Fetch the published list of misrendering codes.
  Problems,
}

#[derive(clap::Args, Debug)]
struct DescriptionArgs {
  #[arg(long, default_value = "")]
  mobile: String,
  #[arg(long, default_value = "")]
  os:     String,
  #[arg(long, default_value = "")]
  other:  String,
}

impl From<DescriptionArgs> for CodeDescription {
  fn from(args: DescriptionArgs) -> Self {
    CodeDescription { mobile: args.mobile, os: args.os, other: args.other }
  }
}

/// Accept `0xe61a`, `e61a` or `&#xe61a;`.
fn parse_code(raw: &str) -> Result<u32, String> {
  if let Some(code) = parse_entity(raw) {
    return Ok(code);
  }
  let hex = raw
    .strip_prefix("0x")
    .or_else(|| raw.strip_prefix("0X"))
    .unwrap_or(raw);
  u32::from_str_radix(hex, 16).map_err(|e| format!("invalid code {raw:?}: {e}"))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let mut settings = Settings::load(&cli.config)?;
  if let Some(database) = cli.database.clone() {
    settings.database = database;
  }

  // Fetching the remote list needs no store.
  if let Command::Disabled(DisabledCommand::Problems) = cli.command {
    let codes = ProblemCodes::new(&settings.problem_codes_url)?
      .fetch()
      .await?;
    return emit(&codes);
  }

  let store = SqliteStore::open(&settings.database, settings.code_range()?)
    .await
    .with_context(|| format!("failed to open store at {}", settings.database.display()))?;

  run(&store, cli).await
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

impl Cli {
  fn actor(&self) -> Result<UserId> {
    match self.actor {
      Some(id) => Ok(UserId(id)),
      None => bail!("this command needs the acting user (--as <USER>)"),
    }
  }
}

async fn run(store: &SqliteStore, cli: Cli) -> Result<()> {
  let actor = cli.actor();
  match cli.command {
    Command::User(UserCommand::Create { name, role }) => {
      emit(&store.create_user(NewUser { name, role }).await?)
    }
    Command::User(UserCommand::Show { id }) => emit(&store.get_user(UserId(id)).await?),

    Command::Repo(RepoCommand::Create { name, alias, admin }) => emit(
      &store
        .create_repo(NewRepo { name, alias, admin: UserId(admin) })
        .await?,
    ),
    Command::Repo(RepoCommand::Show { id }) => emit(&store.get_repo(RepoId(id)).await?),
    Command::Repo(RepoCommand::Publish { id, version }) => {
      let released = store.publish_repo_version(actor?, RepoId(id), version).await?;
      tracing::info!(repo = id, released, "repository published");
      emit(&released)
    }
    Command::Repo(RepoCommand::Links { id }) => emit(&store.repo_versions(RepoId(id)).await?),

    Command::Project(ProjectCommand::Create { name, owner }) => emit(
      &store
        .create_project(NewProject { name, owner: UserId(owner) })
        .await?,
    ),
    Command::Project(ProjectCommand::Add { id, icon }) => emit(
      &store
        .add_project_icon(ProjectId(id), IconId(icon))
        .await?,
    ),
    Command::Project(ProjectCommand::Links { id }) => {
      emit(&store.project_versions(ProjectId(id)).await?)
    }

    Command::Upload { files } => {
      let uploads = files
        .iter()
        .map(|f| svg::load(f))
        .collect::<Result<Vec<_>>>()?;
      emit(&store.upload_icons(actor?, uploads).await?)
    }
    Command::UploadReplacement { file } => {
      emit(&store.upload_replacement(actor?, svg::load(&file)?).await?)
    }

    Command::Submit { repo, font_class, ids } => {
      let ids: Vec<IconId> = ids.into_iter().map(IconId).collect();
      let icons = store.get_icons(ids.clone()).await?;
      if icons.len() != ids.len() {
        let missing: Vec<_> = ids
          .iter()
          .filter(|id| !icons.iter().any(|i| i.id == **id))
          .collect();
        bail!("unknown icons: {missing:?}");
      }
      let submitted = icons
        .into_iter()
        .map(|icon| SubmittedIcon {
          id:            icon.id,
          name:          icon.name,
          tags:          icon.tags,
          font_class:    font_class.clone(),
          adjusted_path: None,
        })
        .collect();
      emit(&store.submit_icons(actor?, RepoId(repo), submitted).await?)
    }
    Command::SubmitReplacement { repo, old, id, name, tags } => {
      let candidate = require_icon(store, id).await?;
      let submission = ReplacementSubmission {
        id:            candidate.id,
        old_id:        IconId(old),
        name:          name.unwrap_or(candidate.name),
        tags:          tags.unwrap_or(candidate.tags),
        font_class:    None,
        adjusted_path: None,
      };
      emit(&store.submit_replacement(actor?, RepoId(repo), submission).await?)
    }

    Command::Delete { id } => emit(&store.delete_icon(actor?, IconId(id)).await?),
    Command::Edit { id, name, tags } => emit(
      &store
        .update_icon_info(actor?, IconId(id), IconInfoUpdate { name, tags })
        .await?,
    ),

    Command::Audit { file } => {
      let cases = read_cases(&file)?;
      let report = store.audit(actor?, cases).await?;
      let failed = report.failures().count();
      if failed > 0 {
        tracing::warn!(failed, "some audit decisions were not applied");
      }
      emit(&report)
    }
    Command::Replace { from, to, name, tags, path } => {
      let old = require_icon(store, from).await?;
      let request = ReplaceRequest {
        from_id:       old.id,
        to_id:         IconId(to),
        name:          name.unwrap_or(old.name),
        tags:          tags.unwrap_or(old.tags),
        adjusted_path: path,
      };
      emit(&store.replace_icon(actor?, request).await?)
    }

    Command::Show { id } => emit(&store.icon_detail(IconId(id)).await?),
    Command::Lineage { id } => emit(&store.lineage(IconId(id)).await?),
    Command::Uploaded { user } => {
      let user = match user {
        Some(id) => UserId(id),
        None => actor?,
      };
      emit(&store.uploaded_icons(user).await?)
    }
    Command::Queue => emit(&store.audit_queue(actor?).await?),
    Command::Search { query } => emit(&store.search(query).await?),
    Command::FreeCodes => emit(&store.free_codes().await?),
    Command::Logs { repo } => emit(&store.logs(repo.map(RepoId)).await?),

    Command::Disabled(command) => disabled(store, actor, command).await,
  }
}

async fn disabled(
  store: &SqliteStore,
  actor: Result<UserId>,
  command: DisabledCommand,
) -> Result<()> {
  match command {
    DisabledCommand::List => emit(&store.disabled_codes().await?),
    DisabledCommand::Set { codes, description, time } => {
      let description = CodeDescription::from(description);
      let requests = codes
        .into_iter()
        .map(|code| DisableRequest { code, description: description.clone(), time })
        .collect();
      emit(&store.set_disabled_codes(actor?, requests).await?)
    }
    DisabledCommand::Unset { id } => {
      emit(&store.unset_disabled_code(actor?, IconId(id)).await?)
    }
    DisabledCommand::Describe { id, description } => emit(
      &store
        .update_code_description(actor?, IconId(id), description.into())
        .await?,
    ),
    DisabledCommand::Problems => bail!("problem codes are fetched without a store"),
  }
}

async fn require_icon(store: &SqliteStore, id: i64) -> Result<iconry_core::icon::Icon> {
  store
    .get_icon(IconId(id))
    .await?
    .with_context(|| format!("icon {id} not found"))
}

fn read_cases(file: &Path) -> Result<Vec<AuditCase>> {
  let raw = if file.as_os_str() == "-" {
    let mut raw = String::new();
    std::io::stdin()
      .read_to_string(&mut raw)
      .context("reading audit decisions from stdin")?;
    raw
  } else {
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?
  };
  serde_json::from_str(&raw).context("parsing audit decisions")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_parse_in_every_accepted_form() {
    assert_eq!(parse_code("0xe61a"), Ok(0xE61A));
    assert_eq!(parse_code("E61A"), Ok(0xE61A));
    assert_eq!(parse_code("&#xe61a;"), Ok(0xE61A));
    assert!(parse_code("arrow").is_err());
  }

  #[test]
  fn audit_decisions_are_tagged_by_kind() {
    let raw = r#"[
      {"kind": "fresh", "id": 3, "repo_id": 1, "passed": true},
      {"kind": "replace", "id": 4, "repo_id": 1, "old_id": 2, "code": 57344,
       "passed": false, "name": "arrow", "tags": "arrow"}
    ]"#;
    let cases: Vec<AuditCase> = serde_json::from_str(raw).unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[1].icon_id(), IconId(4));
    assert!(matches!(cases[0], AuditCase::Fresh(_)));
  }

  #[test]
  fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }

  #[test]
  fn actor_is_global() {
    let cli = Cli::try_parse_from(["iconry", "disabled", "unset", "7", "--as", "1"]).unwrap();
    assert_eq!(cli.actor().unwrap(), UserId(1));
  }
}
