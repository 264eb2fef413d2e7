//! SQL schema for the Iconry SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT    NOT NULL,
    role  INTEGER NOT NULL DEFAULT 0   -- 0 member | 1 repo auditor | 2 super-admin
);

CREATE TABLE IF NOT EXISTS repositories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    alias       TEXT    NOT NULL UNIQUE,
    admin       INTEGER NOT NULL REFERENCES users(id),
    updated_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    name   TEXT    NOT NULL,
    owner  INTEGER NOT NULL REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS icons (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT    NOT NULL,
    tags            TEXT    NOT NULL DEFAULT '',
    font_class      TEXT,
    path            TEXT    NOT NULL,
    uploader        INTEGER NOT NULL REFERENCES users(id),
    code            INTEGER,
    status          INTEGER NOT NULL,
    replace_target  INTEGER REFERENCES icons(id),   -- pending candidates only
    description     TEXT,                           -- JSON, disabled codes only
    apply_time      TEXT    NOT NULL,
    create_time     TEXT    NOT NULL
);

-- At most one RESOLVED (20) or DISABLED (18) row per code.
CREATE UNIQUE INDEX IF NOT EXISTS icons_live_code_idx
    ON icons(code) WHERE status IN (18, 20);

CREATE INDEX IF NOT EXISTS icons_status_idx   ON icons(status);
CREATE INDEX IF NOT EXISTS icons_uploader_idx ON icons(uploader);
CREATE INDEX IF NOT EXISTS icons_target_idx   ON icons(replace_target);

-- Committed replace-chain edges. Append-only.
CREATE TABLE IF NOT EXISTS replacements (
    replacement_id  TEXT    PRIMARY KEY,
    old_icon_id     INTEGER NOT NULL REFERENCES icons(id),
    new_icon_id     INTEGER NOT NULL REFERENCES icons(id),
    kind            TEXT    NOT NULL,   -- 'replace' | 'disable'
    recorded_at     TEXT    NOT NULL,
    UNIQUE (old_icon_id),
    UNIQUE (new_icon_id),
    CHECK  (old_icon_id != new_icon_id)
);

CREATE TABLE IF NOT EXISTS repo_versions (
    repository_id  INTEGER NOT NULL REFERENCES repositories(id),
    icon_id        INTEGER NOT NULL REFERENCES icons(id),
    version        TEXT    NOT NULL,
    UNIQUE (repository_id, icon_id, version)
);

CREATE TABLE IF NOT EXISTS project_versions (
    project_id  INTEGER NOT NULL REFERENCES projects(id),
    icon_id     INTEGER NOT NULL REFERENCES icons(id),
    version     TEXT    NOT NULL,
    UNIQUE (project_id, icon_id, version)
);

CREATE INDEX IF NOT EXISTS repo_versions_icon_idx    ON repo_versions(icon_id);
CREATE INDEX IF NOT EXISTS project_versions_icon_idx ON project_versions(icon_id);

-- Raw uploads kept until the icon is audited or deleted.
CREATE TABLE IF NOT EXISTS caches (
    icon_id  INTEGER PRIMARY KEY REFERENCES icons(id) ON DELETE CASCADE,
    svg      TEXT
);

CREATE TABLE IF NOT EXISTS logs (
    log_id       TEXT    PRIMARY KEY,
    logger_id    INTEGER NOT NULL,   -- repository id, 0 for system entries
    kind         TEXT    NOT NULL,
    params       TEXT    NOT NULL,   -- JSON
    subscribers  TEXT    NOT NULL DEFAULT '[]',
    actor        INTEGER NOT NULL,
    recorded_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS logs_logger_idx ON logs(logger_id, recorded_at);

PRAGMA user_version = 1;
";
