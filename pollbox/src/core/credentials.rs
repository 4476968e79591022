//! Toy credential classification.
//!
//! Passwords are compared as plain strings. There is no hashing and no rate
//! limiting; this scheme only distinguishes the admin from employees.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::io::config::{AuthConfig, ProvisioningConfig};
use crate::model::{ADMIN_ID, User};

static EMPLOYEE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("employee id pattern is valid"));

/// How a login attempt should be resolved against the users collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginTarget {
    /// The administrator account.
    Admin,
    /// A four-digit employee id with the employee password.
    Employee { id: String, number: u32 },
}

/// Match an `(id, password)` pair against the two credential classes.
///
/// Returns `None` when neither the admin nor the employee rule accepts the pair.
pub fn classify(auth: &AuthConfig, id: &str, password: &str) -> Option<LoginTarget> {
    if id == ADMIN_ID {
        return (password == auth.admin_password).then_some(LoginTarget::Admin);
    }
    if !is_employee_id(id) || password != auth.employee_password {
        return None;
    }
    let number = id.parse().ok()?;
    Some(LoginTarget::Employee {
        id: id.to_string(),
        number,
    })
}

pub fn is_employee_id(id: &str) -> bool {
    EMPLOYEE_ID_RE.is_match(id)
}

/// True if an unknown employee number may be created on first login.
pub fn in_provisioning_range(provisioning: &ProvisioningConfig, number: u32) -> bool {
    (provisioning.first_id..=provisioning.last_id).contains(&number)
}

/// Minimal profile for an employee created on first login.
pub fn provisioned_user(provisioning: &ProvisioningConfig, id: &str) -> User {
    User {
        id: id.to_string(),
        name: format!("Employee {id}"),
        email: format!("{id}@{}", provisioning.email_domain),
        department: provisioning.default_department.clone(),
        voted_polls: BTreeMap::new(),
        is_admin: false,
    }
}
