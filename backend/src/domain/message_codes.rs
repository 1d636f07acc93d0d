//! Catalogue of stable message codes, grouped by domain prefix.

use super::message::MessageCode;

/// `GEN-*` codes shared by every service.
pub mod general {
    use super::MessageCode;

    /// Unexpected failure caught at a service boundary.
    pub const UNEXPECTED: MessageCode = MessageCode::from_static("GEN-00001");
    /// Page number or size rejected.
    pub const INVALID_PAGE: MessageCode = MessageCode::from_static("GEN-00002");
    /// Requested include is not a declared relationship.
    pub const INVALID_INCLUDE: MessageCode = MessageCode::from_static("GEN-00003");
    /// Identifier could not be parsed.
    pub const INVALID_ID: MessageCode = MessageCode::from_static("GEN-00004");
}

/// `AUTH-*` codes used by the authentication flows.
pub mod auth {
    use super::MessageCode;

    /// Username or email missing.
    pub const IDENTIFIER_REQUIRED: MessageCode = MessageCode::from_static("AUTH-00001");
    /// Password missing.
    pub const PASSWORD_REQUIRED: MessageCode = MessageCode::from_static("AUTH-00002");
    /// No account matches the identifier.
    pub const USER_NOT_FOUND: MessageCode = MessageCode::from_static("AUTH-00003");
    /// Password does not verify.
    pub const WRONG_PASSWORD: MessageCode = MessageCode::from_static("AUTH-00004");
    /// Email address is malformed.
    pub const EMAIL_INVALID: MessageCode = MessageCode::from_static("AUTH-00005");
    /// Password shorter than the minimum length.
    pub const PASSWORD_TOO_SHORT: MessageCode = MessageCode::from_static("AUTH-00006");
    /// Username or email already registered.
    pub const USER_ALREADY_EXISTS: MessageCode = MessageCode::from_static("AUTH-00007");
    /// MFA challenge issued; the caller must verify the code.
    pub const MFA_REQUIRED: MessageCode = MessageCode::from_static("AUTH-00008");
    /// Mailer failed without a code of its own.
    pub const CODE_NOT_SENT: MessageCode = MessageCode::from_static("AUTH-00009");
    /// Token issuer returned nothing.
    pub const TOKEN_NOT_ISSUED: MessageCode = MessageCode::from_static("AUTH-00010");
    /// No code is pending for the requested purpose.
    pub const CODE_NOT_PENDING: MessageCode = MessageCode::from_static("AUTH-00011");
    /// Supplied code differs from the pending one.
    pub const CODE_MISMATCH: MessageCode = MessageCode::from_static("AUTH-00012");
    /// Pending code has expired.
    pub const CODE_EXPIRED: MessageCode = MessageCode::from_static("AUTH-00013");
    /// Code was redeemed by a concurrent request.
    pub const CODE_ALREADY_USED: MessageCode = MessageCode::from_static("AUTH-00014");
    /// No session holds the supplied token.
    pub const SESSION_NOT_FOUND: MessageCode = MessageCode::from_static("AUTH-00015");
    /// Username missing on registration.
    pub const USERNAME_REQUIRED: MessageCode = MessageCode::from_static("AUTH-00016");
    /// Account created but the verification mail did not go out.
    pub const VERIFICATION_NOT_SENT: MessageCode = MessageCode::from_static("AUTH-00017");
    /// Code is not a six-digit number.
    pub const CODE_FORMAT: MessageCode = MessageCode::from_static("AUTH-00018");
    /// Token missing on logout.
    pub const TOKEN_REQUIRED: MessageCode = MessageCode::from_static("AUTH-00019");
    /// Password reset code sent.
    pub const RESET_CODE_SENT: MessageCode = MessageCode::from_static("AUTH-00020");
}

/// `PRJ-*` codes used by team and project management.
pub mod project {
    use super::MessageCode;

    /// Name missing.
    pub const NAME_REQUIRED: MessageCode = MessageCode::from_static("PRJ-00001");
    /// Project does not exist or is archived.
    pub const PROJECT_NOT_FOUND: MessageCode = MessageCode::from_static("PRJ-00002");
    /// Team does not exist.
    pub const TEAM_NOT_FOUND: MessageCode = MessageCode::from_static("PRJ-00003");
    /// Referenced user does not exist.
    pub const USER_NOT_FOUND: MessageCode = MessageCode::from_static("PRJ-00004");
    /// User already belongs to the team.
    pub const ALREADY_MEMBER: MessageCode = MessageCode::from_static("PRJ-00005");
    /// User does not belong to the team.
    pub const NOT_MEMBER: MessageCode = MessageCode::from_static("PRJ-00006");
    /// Name longer than allowed.
    pub const NAME_TOO_LONG: MessageCode = MessageCode::from_static("PRJ-00007");
    /// Another live project in the team uses the name.
    pub const NAME_TAKEN: MessageCode = MessageCode::from_static("PRJ-00008");
    /// The team owner cannot leave their own team.
    pub const OWNER_REMOVAL: MessageCode = MessageCode::from_static("PRJ-00009");
    /// Comments on the project's duties block the purge.
    pub const PROJECT_HAS_DEPENDENTS: MessageCode = MessageCode::from_static("PRJ-00010");
}

/// `DUT-*` codes used by duty and comment management.
pub mod duty {
    use super::MessageCode;

    /// Title missing.
    pub const TITLE_REQUIRED: MessageCode = MessageCode::from_static("DUT-00001");
    /// Duty does not exist or is archived.
    pub const DUTY_NOT_FOUND: MessageCode = MessageCode::from_static("DUT-00002");
    /// Parent duty belongs to another project.
    pub const PARENT_OUTSIDE_PROJECT: MessageCode = MessageCode::from_static("DUT-00003");
    /// Referenced user does not exist.
    pub const USER_NOT_FOUND: MessageCode = MessageCode::from_static("DUT-00004");
    /// User already assigned.
    pub const ALREADY_ASSIGNED: MessageCode = MessageCode::from_static("DUT-00005");
    /// Sub-duties or comments still reference the duty.
    pub const DUTY_HAS_DEPENDENTS: MessageCode = MessageCode::from_static("DUT-00006");
    /// Comment body missing.
    pub const COMMENT_REQUIRED: MessageCode = MessageCode::from_static("DUT-00007");
    /// Comment does not exist.
    pub const COMMENT_NOT_FOUND: MessageCode = MessageCode::from_static("DUT-00008");
    /// Reply parent belongs to another duty.
    pub const REPLY_OUTSIDE_DUTY: MessageCode = MessageCode::from_static("DUT-00009");
    /// Label name missing.
    pub const LABEL_REQUIRED: MessageCode = MessageCode::from_static("DUT-00010");
    /// Duty already carries the label.
    pub const ALREADY_LABELLED: MessageCode = MessageCode::from_static("DUT-00011");
    /// A duty cannot link to itself.
    pub const SELF_LINK: MessageCode = MessageCode::from_static("DUT-00012");
    /// The duties are already linked.
    pub const ALREADY_LINKED: MessageCode = MessageCode::from_static("DUT-00013");
    /// Title longer than allowed.
    pub const TITLE_TOO_LONG: MessageCode = MessageCode::from_static("DUT-00014");
    /// User already holds this access level.
    pub const ACCESS_ALREADY_GRANTED: MessageCode = MessageCode::from_static("DUT-00015");
}
