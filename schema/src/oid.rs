//! Object identifier decoding and the names of the identifiers that show up
//! in Authenticode signatures.

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

use crate::{bb::ByteBuffer, error::DecodeError};

/// A decoded OID as its sequence of arcs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: Vec<u64>,
}

impl Oid {
    pub fn new(arcs: &[u64]) -> Self {
        Oid { arcs: arcs.to_vec() }
    }

    pub fn arcs(&self) -> &[u64] {
        &self.arcs
    }

    /// Parse the content octets of an OBJECT IDENTIFIER. The first
    /// subidentifier packs the first two arcs.
    pub fn from_content(content: &[u8]) -> Result<Self, DecodeError> {
        if content.is_empty() {
            return Err(DecodeError::Truncated { offset: 0 });
        }
        let mut bb = ByteBuffer::new(content);
        let first = bb.read_base128()?;
        let mut arcs = match first {
            0..=39 => vec![0, first],
            40..=79 => vec![1, first - 40],
            _ => vec![2, first - 80],
        };
        while !bb.is_empty() {
            arcs.push(bb.read_base128()?);
        }
        Ok(Oid { arcs })
    }

    /// Parse the content octets of a RELATIVE-OID.
    pub fn from_relative_content(content: &[u8]) -> Result<Self, DecodeError> {
        if content.is_empty() {
            return Err(DecodeError::Truncated { offset: 0 });
        }
        let mut bb = ByteBuffer::new(content);
        let mut arcs = Vec::new();
        while !bb.is_empty() {
            arcs.push(bb.read_base128()?);
        }
        Ok(Oid { arcs })
    }

    pub fn to_dot_string(&self) -> String {
        self.arcs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The registered name of this OID, if it is one we know.
    pub fn name(&self) -> Option<&'static str> {
        oid_name(&self.to_dot_string())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dot_string())
    }
}

lazy_static! {
    static ref OID_NAMES: HashMap<&'static str, &'static str> = {
        let entries: &[(&str, &str)] = &[
            // PKCS #7
            ("1.2.840.113549.1.7.1", "data"),
            ("1.2.840.113549.1.7.2", "signedData"),
            ("1.2.840.113549.1.7.3", "envelopedData"),
            ("1.2.840.113549.1.7.4", "signedAndEnvelopedData"),
            ("1.2.840.113549.1.7.5", "digestedData"),
            ("1.2.840.113549.1.7.6", "encryptedData"),
            // PKCS #9 attributes
            ("1.2.840.113549.1.9.1", "emailAddress"),
            ("1.2.840.113549.1.9.3", "contentType"),
            ("1.2.840.113549.1.9.4", "messageDigest"),
            ("1.2.840.113549.1.9.5", "signingTime"),
            ("1.2.840.113549.1.9.6", "countersignature"),
            ("1.2.840.113549.1.9.15", "sMIMECapabilities"),
            ("1.2.840.113549.1.9.16.1.4", "tSTInfo"),
            ("1.2.840.113549.1.9.16.2.12", "signingCertificate"),
            ("1.2.840.113549.1.9.16.2.47", "signingCertificateV2"),
            // RSA and digests
            ("1.2.840.113549.1.1.1", "rsaEncryption"),
            ("1.2.840.113549.1.1.4", "md5WithRSAEncryption"),
            ("1.2.840.113549.1.1.5", "sha1WithRSAEncryption"),
            ("1.2.840.113549.1.1.10", "rsassa-pss"),
            ("1.2.840.113549.1.1.11", "sha256WithRSAEncryption"),
            ("1.2.840.113549.1.1.12", "sha384WithRSAEncryption"),
            ("1.2.840.113549.1.1.13", "sha512WithRSAEncryption"),
            ("1.2.840.113549.2.5", "md5"),
            ("1.3.14.3.2.26", "sha1"),
            ("2.16.840.1.101.3.4.2.1", "sha256"),
            ("2.16.840.1.101.3.4.2.2", "sha384"),
            ("2.16.840.1.101.3.4.2.3", "sha512"),
            // Elliptic curves
            ("1.2.840.10045.2.1", "ecPublicKey"),
            ("1.2.840.10045.4.3.2", "ecdsa-with-SHA256"),
            ("1.2.840.10045.4.3.3", "ecdsa-with-SHA384"),
            ("1.2.840.10045.4.3.4", "ecdsa-with-SHA512"),
            ("1.2.840.10045.3.1.7", "prime256v1"),
            ("1.3.132.0.34", "secp384r1"),
            // X.520 attribute types
            ("2.5.4.3", "commonName"),
            ("2.5.4.5", "serialNumber"),
            ("2.5.4.6", "countryName"),
            ("2.5.4.7", "localityName"),
            ("2.5.4.8", "stateOrProvinceName"),
            ("2.5.4.9", "streetAddress"),
            ("2.5.4.10", "organizationName"),
            ("2.5.4.11", "organizationalUnitName"),
            ("2.5.4.15", "businessCategory"),
            ("2.5.4.17", "postalCode"),
            // X.509 extensions
            ("2.5.29.14", "subjectKeyIdentifier"),
            ("2.5.29.15", "keyUsage"),
            ("2.5.29.17", "subjectAltName"),
            ("2.5.29.19", "basicConstraints"),
            ("2.5.29.31", "cRLDistributionPoints"),
            ("2.5.29.32", "certificatePolicies"),
            ("2.5.29.35", "authorityKeyIdentifier"),
            ("2.5.29.37", "extKeyUsage"),
            ("1.3.6.1.5.5.7.1.1", "authorityInfoAccess"),
            ("1.3.6.1.5.5.7.3.3", "codeSigning"),
            ("1.3.6.1.5.5.7.3.8", "timeStamping"),
            ("1.3.6.1.5.5.7.48.1", "ocsp"),
            ("1.3.6.1.5.5.7.48.2", "caIssuers"),
            // Authenticode
            ("1.3.6.1.4.1.311.2.1.4", "SPC_INDIRECT_DATA_OBJID"),
            ("1.3.6.1.4.1.311.2.1.10", "SPC_SP_AGENCY_INFO_OBJID"),
            ("1.3.6.1.4.1.311.2.1.11", "SPC_STATEMENT_TYPE_OBJID"),
            ("1.3.6.1.4.1.311.2.1.12", "SPC_SP_OPUS_INFO_OBJID"),
            ("1.3.6.1.4.1.311.2.1.15", "SPC_PE_IMAGE_DATAOBJ"),
            ("1.3.6.1.4.1.311.2.1.21", "SPC_INDIVIDUAL_SP_KEY_PURPOSE_OBJID"),
            ("1.3.6.1.4.1.311.2.1.22", "SPC_COMMERCIAL_SP_KEY_PURPOSE_OBJID"),
            ("1.3.6.1.4.1.311.2.1.25", "SPC_CAB_DATA_OBJID"),
            ("1.3.6.1.4.1.311.2.1.30", "SPC_SIPINFO_OBJID"),
            ("1.3.6.1.4.1.311.2.4.1", "SPC_NESTED_SIGNATURE_OBJID"),
            ("1.3.6.1.4.1.311.3.3.1", "SPC_RFC3161_OBJID"),
            ("1.3.6.1.4.1.311.10.3.28", "SPC_PLATFORM_MANIFEST_BINARY_ID"),
        ];
        entries.iter().cloned().collect()
    };
}

/// Looks up a dotted OID string in the built-in name table.
pub fn oid_name(dotted: &str) -> Option<&'static str> {
    OID_NAMES.get(dotted).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signed_data_oid() {
        let oid = Oid::from_content(&[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02]).unwrap();
        assert_eq!(oid.arcs(), &[1, 2, 840, 113549, 1, 7, 2]);
        assert_eq!(oid.to_string(), "1.2.840.113549.1.7.2");
        assert_eq!(oid.name(), Some("signedData"));
    }

    #[test]
    fn test_parse_joint_iso_oid() {
        // 2.999.3: first subidentifier 1079 spans two octets
        let oid = Oid::from_content(&[0x88, 0x37, 0x03]).unwrap();
        assert_eq!(oid.arcs(), &[2, 999, 3]);
        assert_eq!(oid.name(), None);
    }

    #[test]
    fn test_parse_malformed_oid() {
        assert!(Oid::from_content(&[]).is_err());
        assert!(Oid::from_content(&[0x2A, 0x86]).is_err());
    }

    #[test]
    fn test_relative_oid() {
        let oid = Oid::from_relative_content(&[0x86, 0x48, 0x01]).unwrap();
        assert_eq!(oid.to_string(), "840.1");
    }
}
