//! 钱包身份（账户公钥）

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{domain::wallet_error::WalletError, utils::address_validator::AddressValidator};

/// 已通过格式校验的账户身份
///
/// 只能通过 [`Identity::parse`] 构造，因此持有 `Identity` 即代表地址合法。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "IdentityRepr", into = "IdentityRepr")]
pub struct Identity {
    public_key: String,
}

#[derive(Serialize, Deserialize)]
struct IdentityRepr {
    public_key: String,
}

impl Identity {
    /// 校验并构造身份
    ///
    /// 首尾空白会被去除；其余必须是合法的 Stellar 账户地址（G 开头，56 位，校验和正确）。
    pub fn parse(public_key: impl AsRef<str>) -> Result<Self, WalletError> {
        let candidate = public_key.as_ref().trim();
        if !AddressValidator::validate_account(candidate) {
            return Err(WalletError::InvalidIdentity(format!(
                "not a valid account address: {}",
                AddressValidator::format_address(candidate, 6, 4)
            )));
        }
        Ok(Self {
            public_key: candidate.to_string(),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// 日志与展示用的缩写形式
    pub fn short(&self) -> String {
        AddressValidator::format_address(&self.public_key, 6, 4)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.public_key)
    }
}

impl TryFrom<IdentityRepr> for Identity {
    type Error = WalletError;

    fn try_from(repr: IdentityRepr) -> Result<Self, Self::Error> {
        Identity::parse(repr.public_key)
    }
}

impl From<Identity> for IdentityRepr {
    fn from(identity: Identity) -> Self {
        IdentityRepr {
            public_key: identity.public_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    #[test]
    fn test_parse_valid_identity() {
        let identity = Identity::parse(VALID).unwrap();
        assert_eq!(identity.public_key(), VALID);
        assert_eq!(identity.short(), "GAAZI4...CWN7");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let identity = Identity::parse(format!("  {}\n", VALID)).unwrap();
        assert_eq!(identity.public_key(), VALID);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let err = Identity::parse("not-an-address").unwrap_err();
        assert!(matches!(err, WalletError::InvalidIdentity(_)));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Identity =
            serde_json::from_value(serde_json::json!({ "public_key": VALID })).unwrap();
        assert_eq!(ok.public_key(), VALID);

        let bad = serde_json::from_value::<Identity>(serde_json::json!({ "public_key": "GABC" }));
        assert!(bad.is_err());
    }
}
