//! Rows of the tables the derived snapshots read.

use nanoid::nanoid;
use serde::Deserialize;
use serde::Serialize;

/// Alphabet and length of generated row ids
const ID_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v',
    'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];
const ID_LENGTH: usize = 6;

pub fn generate_id() -> String {
    nanoid!(ID_LENGTH, &ID_ALPHABET)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Parent,
    #[default]
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub user_type: UserType,
    pub time_zone: String,
    pub disable_limits_until: i64,
    pub category_for_not_assigned_apps: String,
    pub flags: u64,
}

impl User {
    pub fn child(
        id: &str,
        name: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            user_type: UserType::Child,
            time_zone: "UTC".to_string(),
            ..Default::default()
        }
    }

    pub fn parent(
        id: &str,
        name: &str,
    ) -> Self {
        Self {
            user_type: UserType::Parent,
            ..Self::child(id, name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub child_id: String,
    pub title: String,
    pub extra_time_in_millis: i64,
    pub extra_time_day: i32,
    pub temporarily_blocked: bool,
    pub temporarily_blocked_end_time: i64,
    pub parent_category_id: String,
    pub block_all_notifications: bool,
    pub sort: i32,
    pub disable_limits_until: i64,
}

impl Category {
    pub fn new(
        id: &str,
        child_id: &str,
        title: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            child_id: child_id.to_string(),
            title: title.to_string(),
            extra_time_day: -1,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeLimitRule {
    pub id: String,
    pub category_id: String,
    pub apply_to_extra_time_usage: bool,
    /// Bit 0 is monday
    pub day_mask: u8,
    pub maximum_time_in_millis: i32,
    pub start_minute_of_day: i32,
    pub end_minute_of_day: i32,
    pub session_duration_milliseconds: i32,
    pub session_pause_milliseconds: i32,
}

impl TimeLimitRule {
    pub const MIN_START_MINUTE: i32 = 0;
    pub const MAX_END_MINUTE: i32 = 60 * 24 - 1;

    /// Whole-day rule with a fresh id
    pub fn new(
        category_id: &str,
        day_mask: u8,
        maximum_time_in_millis: i32,
    ) -> Self {
        Self {
            id: generate_id(),
            category_id: category_id.to_string(),
            day_mask,
            maximum_time_in_millis,
            start_minute_of_day: Self::MIN_START_MINUTE,
            end_minute_of_day: Self::MAX_END_MINUTE,
            ..Default::default()
        }
    }

    pub fn applies_to_whole_day(&self) -> bool {
        self.start_minute_of_day == Self::MIN_START_MINUTE && self.end_minute_of_day == Self::MAX_END_MINUTE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsedTimeItem {
    pub day_of_epoch: i32,
    pub used_millis: i64,
    pub category_id: String,
    pub start_time_of_day: i32,
    pub end_time_of_day: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionDuration {
    pub category_id: String,
    pub max_session_duration: i32,
    pub session_pause_duration: i32,
    pub start_minute_of_day: i32,
    pub end_minute_of_day: i32,
    pub last_usage: i64,
    pub last_session_duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CategoryApp {
    pub category_id: String,
    /// Package name, optionally followed by `:activity`
    pub package_name: String,
}

impl CategoryApp {
    pub fn new(
        category_id: &str,
        package_name: &str,
    ) -> Self {
        Self {
            category_id: category_id.to_string(),
            package_name: package_name.to_string(),
        }
    }

    pub fn specifies_activity(&self) -> bool {
        self.package_name.contains(':')
    }

    pub fn package_name_without_activity(&self) -> &str {
        match self.package_name.split_once(':') {
            Some((package, _)) => package,
            None => &self.package_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryNetworkId {
    pub category_id: String,
    pub network_item_id: String,
    pub hashed_network_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub model: String,
    pub added_at: i64,
    /// Empty when nobody is signed in
    pub current_user_id: String,
    /// Empty when no default user is configured
    pub default_user: String,
    pub default_user_timeout: i32,
    pub current_app_version: i32,
    pub enable_activity_level_blocking: bool,
}

impl Device {
    pub fn new(
        id: &str,
        name: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Parent `user_id` may only sign in while the category allows it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserLimitLoginCategory {
    pub user_id: String,
    pub category_id: String,
}

/// [`UserLimitLoginCategory`] joined with its category and the owning child
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserLimitLoginCategoryWithChildId {
    pub child_id: String,
    pub child_title: String,
    pub category_id: String,
    pub category_title: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemporarilyAllowedApp {
    pub package_name: String,
}

/// Bits of the experimental-flags configuration item
pub mod experimental_flags {
    pub const DISABLE_BLOCK_ON_MANIPULATION: u64 = 1;
    pub const SYSTEM_LEVEL_BLOCKING: u64 = 2;
    pub const HIDE_MANIPULATION_WARNING: u64 = 4;
    pub const NETWORKTIME_AT_SYSTEMLEVEL: u64 = 8;
}
