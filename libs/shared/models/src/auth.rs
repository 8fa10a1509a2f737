use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<u64>,
}

/// Caller identity as issued by the account provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// The `(user_id, role)` pair every scheduling call is made on behalf of.
///
/// For doctors, `user_id` is the doctor id that owns slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn patient(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Patient)
    }

    pub fn doctor(doctor_id: Uuid) -> Self {
        Self::new(doctor_id, Role::Doctor)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when this actor is the given doctor or an administrator.
    pub fn acts_for_doctor(&self, doctor_id: Uuid) -> bool {
        self.is_admin() || (self.role == Role::Doctor && self.user_id == doctor_id)
    }

    pub fn is_patient(&self, patient_id: Uuid) -> bool {
        self.role == Role::Patient && self.user_id == patient_id
    }
}

impl TryFrom<&User> for Actor {
    type Error = String;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&user.id)
            .map_err(|_| format!("Subject {} is not a valid user id", user.id))?;
        let role = user
            .role
            .as_deref()
            .ok_or_else(|| "Token carries no role".to_string())?
            .parse::<Role>()?;

        Ok(Actor { user_id, role })
    }
}
