//! Domain primitives, aggregates and services.
//!
//! Purpose: define the entity capability contract and enumerable query
//! vocabulary the generic repository port is written against, the coded
//! message model and result envelope every service returns, and the
//! services themselves.
//!
//! Public surface:
//! - Entity / EntityField / EntityId / Audit: capability contract.
//! - Filter / QueryOptions / FieldValue: enumerable query shaping.
//! - Message / MessageCode / ServiceResult: result propagation.
//! - BusinessRules / RuleViolation: fail-fast input validation.
//! - AuthService / ProjectService / DutyService: business operations.

pub mod auth;
pub mod auth_service;
pub mod comment;
pub mod duty;
pub mod duty_service;
pub mod entity;
pub mod message;
pub mod message_codes;
pub mod ports;
pub mod project;
pub mod project_service;
pub mod query;
pub mod relationships;
pub mod rules;
pub mod service_error;
pub mod service_result;
pub mod team;
pub mod user_account;
pub mod views;

pub use self::auth::{
    LoginRequest, LoginResponse, Password, RegisterRequest, ResetPasswordRequest,
    VerifyCodeRequest,
};
pub use self::auth_service::{AuthService, CodeLifetimes};
pub use self::comment::{Comment, CommentField};
pub use self::duty::{
    AccessLevel, Duty, DutyAccess, DutyAccessField, DutyAssignee, DutyAssigneeField, DutyField,
    DutyLabel, DutyLabelField, DutyLink, DutyLinkField, DutyPriority, DutyStatus,
};
pub use self::duty_service::{DutyRepositories, DutyService, NewDuty};
pub use self::entity::{Audit, AuditField, Entity, EntityField, EntityId, EntityIdError};
pub use self::message::{Message, MessageCode, MessageValidationError, Severity};
pub use self::project::{Label, LabelField, Project, ProjectField};
pub use self::project_service::{ProjectRepositories, ProjectService};
pub use self::query::{
    Condition, DeletionScope, Direction, FieldValue, Filter, OrderBy, Predicate, QueryOptions,
    Tracking,
};
pub use self::relationships::{OnDelete, Relationship, duty_schema};
pub use self::rules::{BusinessRules, RuleViolation, run_rules};
pub use self::service_error::{Outcome, ServiceError, settle};
pub use self::service_result::{EnvelopeError, ExtraData, ExtraItem, ResultStatus, ServiceResult};
pub use self::team::{Team, TeamField, TeamMember, TeamMemberField};
pub use self::user_account::{
    AccountChanges, CodePurpose, OneTimeCode, Role, UserAccount, UserAccountField,
};
pub use self::views::{AccessGrantView, CommentView, DutyView, ProjectView, TeamView, UserView};
