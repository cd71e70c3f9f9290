use std::fmt;

/// Caller-enforced limits on the two text columns (NUL terminator not
/// included). [`Row::new`] panics if these are exceeded -- validating
/// user input against them is `statement::prepare_insert`'s job, the row
/// codec itself performs no validation.
pub const USERNAME_MAX_LEN: usize = 32;
pub const EMAIL_MAX_LEN: usize = 255;

const ID_SIZE: usize = size_of::<u32>();
const USERNAME_FIELD_SIZE: usize = USERNAME_MAX_LEN + 1;
const EMAIL_FIELD_SIZE: usize = EMAIL_MAX_LEN + 1;

pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_FIELD_SIZE;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_FIELD_SIZE + EMAIL_FIELD_SIZE;

/// A single record: a `u32` key plus two NUL-terminated, fixed-width text
/// columns. `ROW_SIZE` bytes on disk, byte-stable across versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    username: [u8; USERNAME_FIELD_SIZE],
    email: [u8; EMAIL_FIELD_SIZE],
}

impl Row {
    /// Builds a row from already-validated fields.
    ///
    /// # Panics
    /// Panics if `username` or `email` exceed their maximum widths. Callers
    /// (the statement executor) must validate lengths before reaching here.
    pub fn new(id: u32, username: &str, email: &str) -> Self {
        assert!(
            username.len() <= USERNAME_MAX_LEN,
            "username exceeds field width"
        );
        assert!(email.len() <= EMAIL_MAX_LEN, "email exceeds field width");

        let mut username_bytes = [0u8; USERNAME_FIELD_SIZE];
        username_bytes[..username.len()].copy_from_slice(username.as_bytes());

        let mut email_bytes = [0u8; EMAIL_FIELD_SIZE];
        email_bytes[..email.len()].copy_from_slice(email.as_bytes());

        Self {
            id,
            username: username_bytes,
            email: email_bytes,
        }
    }

    pub fn username(&self) -> &str {
        nul_terminated_str(&self.username)
    }

    pub fn email(&self) -> &str {
        nul_terminated_str(&self.email)
    }

    /// Writes this row's `ROW_SIZE` bytes into `dst[0..ROW_SIZE]`.
    ///
    /// # Panics
    /// Panics if `dst` is shorter than `ROW_SIZE`.
    pub fn serialize(&self, dst: &mut [u8]) {
        dst[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        dst[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_FIELD_SIZE]
            .copy_from_slice(&self.username);
        dst[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_FIELD_SIZE].copy_from_slice(&self.email);
    }

    /// Reads a row out of `src[0..ROW_SIZE]`.
    ///
    /// # Panics
    /// Panics if `src` is shorter than `ROW_SIZE`.
    pub fn deserialize(src: &[u8]) -> Self {
        let id = u32::from_le_bytes(
            src[ID_OFFSET..ID_OFFSET + ID_SIZE]
                .try_into()
                .expect("ID_SIZE bytes"),
        );

        let mut username = [0u8; USERNAME_FIELD_SIZE];
        username.copy_from_slice(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_FIELD_SIZE]);

        let mut email = [0u8; EMAIL_FIELD_SIZE];
        email.copy_from_slice(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_FIELD_SIZE]);

        Self {
            id,
            username,
            email,
        }
    }
}

fn nul_terminated_str(field: &[u8]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    std::str::from_utf8(&field[..end]).expect("field bytes are valid UTF-8 by construction")
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username(), self.email())
    }
}
