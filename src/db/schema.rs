//! SQL DDL for initializing the database schema.
//! SQLite-first design; can be adapted for other RDBMS.

/// Social-auth tables:
/// - `social_auth_usersocialauth` (one (provider, uid) per row)
/// - `social_auth_nonce` (one (server_url, timestamp, salt) per row)
/// - `social_auth_association` (one (server_url, handle) per row)
/// - `social_auth_code` (one code per row)
/// - `social_auth_partial` (one token per row)
///
/// `user_id` is not a foreign key: the user table belongs to the application.
pub const SOCIAL_AUTH_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Local user <-> provider identity
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS social_auth_usersocialauth (
    id INTEGER PRIMARY KEY NOT NULL,
    provider TEXT NOT NULL,
    uid TEXT NOT NULL,
    extra_data TEXT NULL, -- JSON
    user_id INTEGER NOT NULL,
    UNIQUE(provider, uid)
);

CREATE INDEX IF NOT EXISTS idx_usersocialauth_user ON social_auth_usersocialauth(user_id);

-- ---------------------------------------------------------------------------
-- One-time values (replay protection)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS social_auth_nonce (
    id INTEGER PRIMARY KEY NOT NULL,
    server_url TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    salt TEXT NOT NULL,
    UNIQUE(server_url, timestamp, salt)
);

-- ---------------------------------------------------------------------------
-- OpenID associations
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS social_auth_association (
    id INTEGER PRIMARY KEY NOT NULL,
    server_url TEXT NOT NULL,
    handle TEXT NOT NULL,
    secret TEXT NOT NULL, -- base64
    issued TEXT NOT NULL,
    lifetime TEXT NOT NULL,
    assoc_type TEXT NOT NULL,
    UNIQUE(server_url, handle)
);

-- ---------------------------------------------------------------------------
-- Email verification codes
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS social_auth_code (
    id INTEGER PRIMARY KEY NOT NULL,
    email TEXT NOT NULL,
    code TEXT NOT NULL UNIQUE,
    verified INTEGER NOT NULL DEFAULT 0,
    issued TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_code_email ON social_auth_code(email);

-- ---------------------------------------------------------------------------
-- Interrupted pipelines
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS social_auth_partial (
    id INTEGER PRIMARY KEY NOT NULL,
    token TEXT NOT NULL UNIQUE,
    data TEXT NULL, -- JSON
    next_step INTEGER NOT NULL,
    backend TEXT NOT NULL
);
"#;

/// Table backing the bundled [`User`](crate::db::User) model.
pub const USER_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL DEFAULT '',
    password TEXT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
"#;
