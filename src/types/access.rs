//! Access-control entities: descriptors, detected-face geometry, users,
//! visits, and access-check results.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DESCRIPTOR_LEN;
use crate::error::{Error, Result};

/// A fixed-length numeric embedding of a face.
///
/// Descriptors are never compared for exact equality during matching --
/// only through a similarity predicate (distance threshold). The
/// 128-element length is validated at every construction site, including
/// deserialization.
///
/// # Examples
///
/// ```
/// use gatenode::types::Descriptor;
///
/// let zero = Descriptor::new(vec![0.0; 128]).unwrap();
/// let one = Descriptor::new(vec![1.0; 128]).unwrap();
/// assert!((zero.distance(&one) - (128.0f64).sqrt()).abs() < 1e-12);
///
/// assert!(Descriptor::new(vec![0.0; 12]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Descriptor(Vec<f64>);

impl Descriptor {
    /// Wraps a raw vector, validating its length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] if the vector is not
    /// [`DESCRIPTOR_LEN`] elements long.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.len() != DESCRIPTOR_LEN {
            return Err(Error::Recognition(format!(
                "descriptor has {} elements, expected {DESCRIPTOR_LEN}",
                values.len()
            )));
        }
        Ok(Self(values))
    }

    /// The raw descriptor values.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance to another descriptor. Symmetric.
    pub fn distance(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Encodes the descriptor as base64 over little-endian `f64` bytes,
    /// for transport inside textual payloads.
    pub fn to_base64(&self) -> String {
        let bytes: Vec<u8> = self.0.iter().flat_map(|v| v.to_le_bytes()).collect();
        BASE64.encode(bytes)
    }

    /// Decodes a descriptor produced by [`to_base64`](Self::to_base64).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Recognition`] on malformed base64 or a byte
    /// length that does not decode to [`DESCRIPTOR_LEN`] floats.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| Error::Recognition(format!("malformed descriptor encoding: {e}")))?;
        if bytes.len() != DESCRIPTOR_LEN * 8 {
            return Err(Error::Recognition(format!(
                "descriptor encoding has {} bytes, expected {}",
                bytes.len(),
                DESCRIPTOR_LEN * 8
            )));
        }
        let values = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                f64::from_le_bytes(buf)
            })
            .collect();
        Self::new(values)
    }
}

impl TryFrom<Vec<f64>> for Descriptor {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<Descriptor> for Vec<f64> {
    fn from(descriptor: Descriptor) -> Self {
        descriptor.0
    }
}

/// An axis-aligned detection rectangle in frame coordinates.
///
/// Used only to pick the most prominent detected face when several are
/// found: largest [`area`](Self::area) wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rectangle {
    /// Creates a rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatenode::types::Rectangle;
    ///
    /// assert_eq!(Rectangle::new(0, 0, 4, 3).area(), 12);
    /// ```
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A registered user of the access-control system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Authority-assigned user id.
    pub id: i64,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Patronymic.
    pub patronymic: String,
    /// Job position, when the authority knows one.
    #[serde(default)]
    pub position: Option<String>,
}

impl User {
    /// One-line form for the hardware display:
    /// `"{surname} {name-initial}. {patronymic-initial}."`.
    /// Missing name parts are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatenode::types::User;
    ///
    /// let user = User {
    ///     id: 1,
    ///     name: "Alan".into(),
    ///     surname: "Turing".into(),
    ///     patronymic: "Mathison".into(),
    ///     position: None,
    /// };
    /// assert_eq!(user.display_line(), "Turing A. M.");
    /// ```
    pub fn display_line(&self) -> String {
        let mut line = self.surname.clone();
        for part in [&self.name, &self.patronymic] {
            if let Some(initial) = part.chars().next() {
                line.push(' ');
                line.push(initial);
                line.push('.');
            }
        }
        line
    }
}

/// A recorded entry through the door, reported to the authority after a
/// granted access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    /// Who entered.
    pub user_id: i64,
    /// When they entered.
    pub at: DateTime<Utc>,
}

/// The authority's verdict on one access check.
///
/// Transient: produced per check, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessCheck {
    /// Whether the descriptor matched a registered identity.
    pub is_known: bool,
    /// Whether that identity currently has access (e.g. within allowed
    /// hours). Meaningless when `is_known` is false.
    pub accessed: bool,
    /// The identified user, present when `is_known` is true.
    #[serde(default)]
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(fill: f64) -> Descriptor {
        Descriptor::new(vec![fill; DESCRIPTOR_LEN]).unwrap()
    }

    #[test]
    fn distance_is_symmetric() {
        let a = descriptor(0.25);
        let b = descriptor(-1.5);
        assert_eq!(a.distance(&b), b.distance(&a));
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn serde_rejects_wrong_length() {
        let short = serde_json::json!([0.0, 1.0, 2.0]);
        assert!(serde_json::from_value::<Descriptor>(short).is_err());

        let ok = serde_json::json!(vec![0.5; DESCRIPTOR_LEN]);
        let parsed: Descriptor = serde_json::from_value(ok).unwrap();
        assert_eq!(parsed.as_slice().len(), DESCRIPTOR_LEN);
    }

    #[test]
    fn base64_round_trip_preserves_values() {
        let values: Vec<f64> = (0..DESCRIPTOR_LEN).map(|i| i as f64 * 0.125 - 3.0).collect();
        let original = Descriptor::new(values).unwrap();
        let decoded = Descriptor::from_base64(&original.to_base64()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn base64_rejects_truncated_payload() {
        let encoded = descriptor(1.0).to_base64();
        let truncated = &encoded[..encoded.len() / 2];
        assert!(Descriptor::from_base64(truncated).is_err());
        assert!(Descriptor::from_base64("not base64 !!!").is_err());
    }

    #[test]
    fn largest_rectangle_by_area() {
        let small = Rectangle::new(0, 0, 2, 2);
        let large = Rectangle::new(5, 5, 10, 10);
        assert!(large.area() > small.area());
    }

    #[test]
    fn display_line_skips_empty_parts() {
        let user = User {
            id: 2,
            name: String::new(),
            surname: "Hopper".into(),
            patronymic: String::new(),
            position: Some("Rear Admiral".into()),
        };
        assert_eq!(user.display_line(), "Hopper");
    }

    #[test]
    fn access_check_defaults_user_to_none() {
        let check: AccessCheck =
            serde_json::from_value(serde_json::json!({"is_known": false, "accessed": false}))
                .unwrap();
        assert!(check.user.is_none());
    }
}
