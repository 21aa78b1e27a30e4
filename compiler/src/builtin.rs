use pe2pkcs7_schema::Schema;

use crate::{compiler::compile_schema, error::Pe2Pkcs7Error};

/// Definition rendered at the top level when no other root is requested.
pub const DEFAULT_ROOT: &str = "AuthenticodeSignature";

/// PKCS#7 SignedData as used by Authenticode, with the X.509 certificate
/// types it embeds and the Microsoft SPC structures.
pub const AUTHENTICODE: &str = r#"
Authenticode DEFINITIONS EXPLICIT TAGS ::= BEGIN

-- PKCS #7 (RFC 2315), content fixed to SignedData
AuthenticodeSignature ::= SEQUENCE {
    contentType             ContentType,
    content                 [0] EXPLICIT SignedData
}

ContentInfo ::= SEQUENCE {
    contentType             ContentType,
    content                 [0] EXPLICIT ANY DEFINED BY contentType OPTIONAL
}

ContentType ::= OBJECT IDENTIFIER

SignedData ::= SEQUENCE {
    version                 Version,
    digestAlgorithms        DigestAlgorithmIdentifiers,
    contentInfo             SpcContentInfo,
    certificates            [0] IMPLICIT ExtendedCertificatesAndCertificates OPTIONAL,
    crls                    [1] IMPLICIT CertificateRevocationLists OPTIONAL,
    signerInfos             SignerInfos
}

SpcContentInfo ::= SEQUENCE {
    contentType             ContentType,
    content                 [0] EXPLICIT SpcIndirectDataContent OPTIONAL
}

Version ::= INTEGER

DigestAlgorithmIdentifiers ::= SET OF DigestAlgorithmIdentifier

DigestAlgorithmIdentifier ::= AlgorithmIdentifier

DigestEncryptionAlgorithmIdentifier ::= AlgorithmIdentifier

ExtendedCertificatesAndCertificates ::= SET OF Certificate

CertificateRevocationLists ::= SET OF ANY

SignerInfos ::= SET OF SignerInfo

SignerInfo ::= SEQUENCE {
    version                     Version,
    issuerAndSerialNumber       IssuerAndSerialNumber,
    digestAlgorithm             DigestAlgorithmIdentifier,
    authenticatedAttributes     [0] IMPLICIT Attributes OPTIONAL,
    digestEncryptionAlgorithm   DigestEncryptionAlgorithmIdentifier,
    encryptedDigest             EncryptedDigest,
    unauthenticatedAttributes   [1] IMPLICIT Attributes OPTIONAL
}

IssuerAndSerialNumber ::= SEQUENCE {
    issuer                  Name,
    serialNumber            CertificateSerialNumber
}

EncryptedDigest ::= OCTET STRING

Attributes ::= SET OF Attribute

Attribute ::= SEQUENCE {
    type                    AttributeType,
    values                  SET OF AttributeValue
}

AttributeType ::= OBJECT IDENTIFIER

AttributeValue ::= ANY

DigestInfo ::= SEQUENCE {
    digestAlgorithm         DigestAlgorithmIdentifier,
    digest                  OCTET STRING
}

AlgorithmIdentifier ::= SEQUENCE {
    algorithm               OBJECT IDENTIFIER,
    parameters              ANY DEFINED BY algorithm OPTIONAL
}

-- X.509 (RFC 5280)
Certificate ::= SEQUENCE {
    tbsCertificate          TBSCertificate,
    signatureAlgorithm      AlgorithmIdentifier,
    signatureValue          BIT STRING
}

TBSCertificate ::= SEQUENCE {
    version                 [0] EXPLICIT CertificateVersion DEFAULT v1,
    serialNumber            CertificateSerialNumber,
    signature               AlgorithmIdentifier,
    issuer                  Name,
    validity                Validity,
    subject                 Name,
    subjectPublicKeyInfo    SubjectPublicKeyInfo,
    issuerUniqueID          [1] IMPLICIT UniqueIdentifier OPTIONAL,
    subjectUniqueID         [2] IMPLICIT UniqueIdentifier OPTIONAL,
    extensions              [3] EXPLICIT Extensions OPTIONAL
}

CertificateVersion ::= INTEGER { v1(0), v2(1), v3(2) }

CertificateSerialNumber ::= INTEGER

UniqueIdentifier ::= BIT STRING

Validity ::= SEQUENCE {
    notBefore               Time,
    notAfter                Time
}

Time ::= CHOICE {
    utcTime                 UTCTime,
    generalTime             GeneralizedTime
}

Name ::= CHOICE {
    rdnSequence             RDNSequence
}

RDNSequence ::= SEQUENCE OF RelativeDistinguishedName

RelativeDistinguishedName ::= SET SIZE (1..MAX) OF AttributeTypeAndValue

AttributeTypeAndValue ::= SEQUENCE {
    type                    AttributeType,
    value                   AttributeValue
}

SubjectPublicKeyInfo ::= SEQUENCE {
    algorithm               AlgorithmIdentifier,
    subjectPublicKey        BIT STRING
}

Extensions ::= SEQUENCE SIZE (1..MAX) OF Extension

Extension ::= SEQUENCE {
    extnID                  OBJECT IDENTIFIER,
    critical                BOOLEAN DEFAULT FALSE,
    extnValue               OCTET STRING
}

-- Authenticode SPC structures
SpcIndirectDataContent ::= SEQUENCE {
    data                    SpcAttributeTypeAndOptionalValue,
    messageDigest           DigestInfo
}

SpcAttributeTypeAndOptionalValue ::= SEQUENCE {
    type                    OBJECT IDENTIFIER,
    value                   SpcPeImageData OPTIONAL
}

SpcPeImageData ::= SEQUENCE {
    flags                   SpcPeImageFlags DEFAULT { includeResources },
    file                    [0] SpcLink OPTIONAL
}

SpcPeImageFlags ::= BIT STRING {
    includeResources            (0),
    includeDebugInfo            (1),
    includeImportAddressTable   (2)
}

SpcLink ::= CHOICE {
    url                     [0] IMPLICIT IA5String,
    moniker                 [1] IMPLICIT SpcSerializedObject,
    file                    [2] EXPLICIT SpcString
}

SpcString ::= CHOICE {
    unicode                 [0] IMPLICIT BMPString,
    ascii                   [1] IMPLICIT IA5String
}

SpcSerializedObject ::= SEQUENCE {
    classId                 SpcUuid,
    serializedData          OCTET STRING
}

SpcUuid ::= OCTET STRING

SpcSpOpusInfo ::= SEQUENCE {
    programName             [0] EXPLICIT SpcString OPTIONAL,
    moreInfo                [1] EXPLICIT SpcLink OPTIONAL
}

END
"#;

/// Compiles [AUTHENTICODE].
pub fn builtin_schema() -> Result<Schema, Pe2Pkcs7Error> {
    compile_schema(AUTHENTICODE)
}
