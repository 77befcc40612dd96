use std::fmt;

use bitflags::bitflags;
use serde::Deserialize;
use serde::Serialize;

/// Every table of the backing store that can be invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    AllowedContact,
    App,
    AppActivity,
    Category,
    CategoryApp,
    ConfigurationItem,
    Device,
    SessionDuration,
    TemporarilyAllowedApp,
    TimeLimitRule,
    UsedTimeItem,
    User,
    UserKey,
    UserLimitLoginCategory,
    CategoryNetworkId,
}

impl Table {
    pub const ALL: [Table; 15] = [
        Table::AllowedContact,
        Table::App,
        Table::AppActivity,
        Table::Category,
        Table::CategoryApp,
        Table::ConfigurationItem,
        Table::Device,
        Table::SessionDuration,
        Table::TemporarilyAllowedApp,
        Table::TimeLimitRule,
        Table::UsedTimeItem,
        Table::User,
        Table::UserKey,
        Table::UserLimitLoginCategory,
        Table::CategoryNetworkId,
    ];

    /// Name of the table in the store schema
    pub fn name(self) -> &'static str {
        match self {
            Table::AllowedContact => "allowed_contact",
            Table::App => "app",
            Table::AppActivity => "app_activity",
            Table::Category => "category",
            Table::CategoryApp => "category_app",
            Table::ConfigurationItem => "config",
            Table::Device => "device",
            Table::SessionDuration => "session_duration",
            Table::TemporarilyAllowedApp => "temporarily_allowed_app",
            Table::TimeLimitRule => "time_limit_rule",
            Table::UsedTimeItem => "used_time",
            Table::User => "user",
            Table::UserKey => "user_key",
            Table::UserLimitLoginCategory => "user_limit_login_category",
            Table::CategoryNetworkId => "category_network_id",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|table| table.name() == name)
    }

    pub fn flag(self) -> TableSet {
        match self {
            Table::AllowedContact => TableSet::ALLOWED_CONTACT,
            Table::App => TableSet::APP,
            Table::AppActivity => TableSet::APP_ACTIVITY,
            Table::Category => TableSet::CATEGORY,
            Table::CategoryApp => TableSet::CATEGORY_APP,
            Table::ConfigurationItem => TableSet::CONFIGURATION_ITEM,
            Table::Device => TableSet::DEVICE,
            Table::SessionDuration => TableSet::SESSION_DURATION,
            Table::TemporarilyAllowedApp => TableSet::TEMPORARILY_ALLOWED_APP,
            Table::TimeLimitRule => TableSet::TIME_LIMIT_RULE,
            Table::UsedTimeItem => TableSet::USED_TIME_ITEM,
            Table::User => TableSet::USER,
            Table::UserKey => TableSet::USER_KEY,
            Table::UserLimitLoginCategory => TableSet::USER_LIMIT_LOGIN_CATEGORY,
            Table::CategoryNetworkId => TableSet::CATEGORY_NETWORK_ID,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of tables touched by a commit or watched by an observer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TableSet: u32 {
        const ALLOWED_CONTACT = 1 << 0;
        const APP = 1 << 1;
        const APP_ACTIVITY = 1 << 2;
        const CATEGORY = 1 << 3;
        const CATEGORY_APP = 1 << 4;
        const CONFIGURATION_ITEM = 1 << 5;
        const DEVICE = 1 << 6;
        const SESSION_DURATION = 1 << 7;
        const TEMPORARILY_ALLOWED_APP = 1 << 8;
        const TIME_LIMIT_RULE = 1 << 9;
        const USED_TIME_ITEM = 1 << 10;
        const USER = 1 << 11;
        const USER_KEY = 1 << 12;
        const USER_LIMIT_LOGIN_CATEGORY = 1 << 13;
        const CATEGORY_NETWORK_ID = 1 << 14;
    }
}

impl TableSet {
    pub fn tables(self) -> impl Iterator<Item = Table> {
        Table::ALL.into_iter().filter(move |table| self.contains(table.flag()))
    }
}

impl From<Table> for TableSet {
    fn from(table: Table) -> Self {
        table.flag()
    }
}

impl FromIterator<Table> for TableSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        iter.into_iter().fold(TableSet::empty(), |set, table| set | table.flag())
    }
}
