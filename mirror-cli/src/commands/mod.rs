//! CLI command implementations.

pub mod list;
pub mod refresh;
pub mod show;
pub mod status;

use mirror_types::UserRecord;

/// One-line summary of a user, as printed by `list`.
pub fn summary_line(user: &UserRecord) -> String {
    format!("{:>4}  {:<28} {}", user.id, user.name, user.email)
}
