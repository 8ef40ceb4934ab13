pub mod audit;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod roles;

pub use domain::category::{Category, CategoryTable};
pub use domain::event::{EventRecord, ParticipantEntry, PollDraft};
pub use domain::ids::{ChannelId, EventId, GuildId, MessageId, RoleId, UserId};
pub use domain::member::{GuildRole, Member, Permissions};
pub use domain::verification::{VerificationRecord, VerificationStatus, Vocation};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ledger::{ControlState, PollState, SignupLedger, VoteOutcome};
pub use roles::{BulkAction, BulkReport, MemberOutcome, RoleRoster, RoleSession};
