//! KSR/SKR XML codec (SPEC_FULL.md §4.1, §6).
//!
//! A thin serde-oriented adapter: deserialize into an XML-shaped
//! intermediate struct via `quick-xml`'s serde integration, then convert
//! into/from the canonical [`ksrsigner_domain::model`] types. No teacher
//! module reads XML directly; this follows the standard `quick_xml::de`/
//! `quick_xml::se` + `serde` pairing used across the Rust DNS tooling
//! ecosystem for exactly this kind of wire-format adapter.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use ksrsigner_domain::model::{
    AlgorithmDnssec, AlgorithmPolicy, Bundle, Key, Request, Response, Signature, SignaturePolicy,
};
use ksrsigner_domain::CodecError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
struct SignatureAlgorithmXml {
    #[serde(rename = "@algorithm")]
    algorithm: String,
    #[serde(rename = "RSA", skip_serializing_if = "Option::is_none")]
    rsa: Option<RsaAlgorithmXml>,
    #[serde(rename = "ECDSA", skip_serializing_if = "Option::is_none")]
    ecdsa: Option<EcdsaAlgorithmXml>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct RsaAlgorithmXml {
    size: u16,
    exponent: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct EcdsaAlgorithmXml {
    size: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct SignaturePolicyXml {
    #[serde(rename = "PublishSafety")]
    publish_safety: String,
    #[serde(rename = "RetireSafety")]
    retire_safety: String,
    #[serde(rename = "MaxSignatureValidity")]
    max_signature_validity: String,
    #[serde(rename = "MinSignatureValidity")]
    min_signature_validity: String,
    #[serde(rename = "MaxValidityOverlap")]
    max_validity_overlap: String,
    #[serde(rename = "MinValidityOverlap")]
    min_validity_overlap: String,
    #[serde(rename = "SignatureAlgorithm", default)]
    algorithms: Vec<SignatureAlgorithmXml>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct KeyXml {
    #[serde(rename = "KeyIdentifier")]
    key_identifier: String,
    #[serde(rename = "Flags")]
    flags: u16,
    #[serde(rename = "Protocol")]
    protocol: u8,
    #[serde(rename = "Algorithm")]
    algorithm: u8,
    #[serde(rename = "PublicKey")]
    public_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct SignatureXml {
    #[serde(rename = "KeyIdentifier")]
    key_identifier: String,
    #[serde(rename = "Algorithm")]
    algorithm: u8,
    #[serde(rename = "KeyTag")]
    key_tag: u16,
    #[serde(rename = "SignersName")]
    signers_name: String,
    #[serde(rename = "SignatureInception")]
    signature_inception: DateTime<Utc>,
    #[serde(rename = "SignatureExpiration")]
    signature_expiration: DateTime<Utc>,
    #[serde(rename = "SignatureData")]
    signature_data: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct BundleXml {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Inception")]
    inception: DateTime<Utc>,
    #[serde(rename = "Expiration")]
    expiration: DateTime<Utc>,
    #[serde(rename = "Key", default)]
    keys: Vec<KeyXml>,
    #[serde(rename = "Signature", default)]
    signatures: Vec<SignatureXml>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename = "KeySigningRequest")]
struct KeySigningRequestXml {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Serial")]
    serial: u32,
    #[serde(rename = "Domain")]
    domain: String,
    #[serde(rename = "Timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "ZSK")]
    zsk: SignaturePolicyXml,
    #[serde(rename = "RequestBundle", default)]
    bundles: Vec<BundleXml>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename = "SignedKeyResponse")]
struct SignedKeyResponseXml {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Serial")]
    serial: u32,
    #[serde(rename = "Domain")]
    domain: String,
    #[serde(rename = "Timestamp")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "KSK")]
    ksk: SignaturePolicyXml,
    #[serde(rename = "ResponseBundle", default)]
    bundles: Vec<BundleXml>,
}

fn policy_from_xml(xml: SignaturePolicyXml) -> Result<SignaturePolicy, CodecError> {
    let duration = |field: &'static str, s: &str| {
        ksrsigner_domain::duration::period(s).map_err(|_| {
            CodecError::Duration(format!("{field}: {s:?}"))
        })
    };
    let algorithms = xml
        .algorithms
        .into_iter()
        .map(algorithm_policy_from_xml)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SignaturePolicy {
        publish_safety: duration("PublishSafety", &xml.publish_safety)?,
        retire_safety: duration("RetireSafety", &xml.retire_safety)?,
        max_signature_validity: duration("MaxSignatureValidity", &xml.max_signature_validity)?,
        min_signature_validity: duration("MinSignatureValidity", &xml.min_signature_validity)?,
        max_validity_overlap: duration("MaxValidityOverlap", &xml.max_validity_overlap)?,
        min_validity_overlap: duration("MinValidityOverlap", &xml.min_validity_overlap)?,
        algorithms,
    })
}

fn policy_to_xml(policy: &SignaturePolicy) -> SignaturePolicyXml {
    SignaturePolicyXml {
        publish_safety: ksrsigner_domain::duration::format_duration(policy.publish_safety),
        retire_safety: ksrsigner_domain::duration::format_duration(policy.retire_safety),
        max_signature_validity: ksrsigner_domain::duration::format_duration(policy.max_signature_validity),
        min_signature_validity: ksrsigner_domain::duration::format_duration(policy.min_signature_validity),
        max_validity_overlap: ksrsigner_domain::duration::format_duration(policy.max_validity_overlap),
        min_validity_overlap: ksrsigner_domain::duration::format_duration(policy.min_validity_overlap),
        algorithms: policy.algorithms.iter().map(algorithm_policy_to_xml).collect(),
    }
}

fn algorithm_policy_from_xml(xml: SignatureAlgorithmXml) -> Result<AlgorithmPolicy, CodecError> {
    let algorithm = parse_algorithm_number(&xml.algorithm)?;
    if let Some(rsa) = xml.rsa {
        Ok(AlgorithmPolicy::Rsa {
            algorithm,
            bits: rsa.size,
            exponent: rsa.exponent,
        })
    } else if let Some(ecdsa) = xml.ecdsa {
        Ok(AlgorithmPolicy::Ecdsa {
            algorithm,
            bits: ecdsa.size,
        })
    } else {
        Err(CodecError::Xml("SignatureAlgorithm missing RSA/ECDSA body".to_string()))
    }
}

fn algorithm_policy_to_xml(policy: &AlgorithmPolicy) -> SignatureAlgorithmXml {
    match policy {
        AlgorithmPolicy::Rsa { algorithm, bits, exponent } => SignatureAlgorithmXml {
            algorithm: algorithm.to_u8().to_string(),
            rsa: Some(RsaAlgorithmXml { size: *bits, exponent: *exponent }),
            ecdsa: None,
        },
        AlgorithmPolicy::Ecdsa { algorithm, bits } => SignatureAlgorithmXml {
            algorithm: algorithm.to_u8().to_string(),
            rsa: None,
            ecdsa: Some(EcdsaAlgorithmXml { size: *bits }),
        },
    }
}

fn parse_algorithm_number(s: &str) -> Result<AlgorithmDnssec, CodecError> {
    let value: u8 = s
        .parse()
        .map_err(|_| CodecError::Xml(format!("invalid algorithm number {s:?}")))?;
    AlgorithmDnssec::from_u8(value).ok_or_else(|| CodecError::Xml(format!("unknown algorithm number {value}")))
}

fn key_from_xml(xml: KeyXml) -> Result<Key, CodecError> {
    let algorithm = AlgorithmDnssec::from_u8(xml.algorithm)
        .ok_or_else(|| CodecError::Xml(format!("unknown key algorithm {}", xml.algorithm)))?;
    let public_key = BASE64
        .decode(xml.public_key.trim())
        .map_err(|e| CodecError::Base64(e.to_string()))?;
    Ok(Key {
        key_identifier: xml.key_identifier,
        key_tag: 0,
        algorithm,
        flags: xml.flags,
        protocol: xml.protocol,
        ttl: 0,
        public_key,
    })
}

fn key_to_xml(key: &Key) -> KeyXml {
    KeyXml {
        key_identifier: key.key_identifier.clone(),
        flags: key.flags,
        protocol: key.protocol,
        algorithm: key.algorithm.to_u8(),
        public_key: BASE64.encode(&key.public_key),
    }
}

fn signature_from_xml(xml: SignatureXml) -> Result<Signature, CodecError> {
    let algorithm = AlgorithmDnssec::from_u8(xml.algorithm)
        .ok_or_else(|| CodecError::Xml(format!("unknown signature algorithm {}", xml.algorithm)))?;
    let signature_data = BASE64
        .decode(xml.signature_data.trim())
        .map_err(|e| CodecError::Base64(e.to_string()))?;
    Ok(Signature {
        key_identifier: xml.key_identifier,
        key_tag: xml.key_tag,
        algorithm,
        labels: 0,
        original_ttl: 0,
        signature_inception: xml.signature_inception,
        signature_expiration: xml.signature_expiration,
        signer_name: xml.signers_name,
        signature_data,
    })
}

fn signature_to_xml(signature: &Signature) -> SignatureXml {
    SignatureXml {
        key_identifier: signature.key_identifier.clone(),
        algorithm: signature.algorithm.to_u8(),
        key_tag: signature.key_tag,
        signers_name: signature.signer_name.clone(),
        signature_inception: signature.signature_inception,
        signature_expiration: signature.signature_expiration,
        signature_data: BASE64.encode(&signature.signature_data),
    }
}

fn bundle_from_xml(xml: BundleXml) -> Result<Bundle, CodecError> {
    Ok(Bundle {
        id: xml.id,
        inception: xml.inception,
        expiration: xml.expiration,
        keys: xml.keys.into_iter().map(key_from_xml).collect::<Result<_, _>>()?,
        signatures: xml
            .signatures
            .into_iter()
            .map(signature_from_xml)
            .collect::<Result<_, _>>()?,
    })
}

fn bundle_to_xml(bundle: &Bundle) -> BundleXml {
    BundleXml {
        id: bundle.id.clone(),
        inception: bundle.inception,
        expiration: bundle.expiration,
        keys: bundle.keys.iter().map(key_to_xml).collect(),
        signatures: bundle.signatures.iter().map(signature_to_xml).collect(),
    }
}

/// Parse a KSR XML document into the canonical [`Request`].
pub fn decode_request(xml: &str) -> Result<Request, CodecError> {
    let parsed: KeySigningRequestXml =
        quick_xml::de::from_str(xml).map_err(|e| CodecError::Xml(e.to_string()))?;
    Ok(Request {
        id: parsed.id,
        serial: parsed.serial,
        domain: parsed.domain,
        timestamp: parsed.timestamp,
        zsk_policy: policy_from_xml(parsed.zsk)?,
        bundles: parsed.bundles.into_iter().map(bundle_from_xml).collect::<Result<_, _>>()?,
    })
}

/// Serialize a [`Request`] back into KSR XML.
pub fn encode_request(request: &Request) -> Result<String, CodecError> {
    let xml = KeySigningRequestXml {
        id: request.id.clone(),
        serial: request.serial,
        domain: request.domain.clone(),
        timestamp: request.timestamp,
        zsk: policy_to_xml(&request.zsk_policy),
        bundles: request.bundles.iter().map(bundle_to_xml).collect(),
    };
    quick_xml::se::to_string(&xml).map_err(|e| CodecError::Xml(e.to_string()))
}

/// Parse an SKR XML document into the canonical [`Response`].
pub fn decode_response(xml: &str) -> Result<Response, CodecError> {
    let parsed: SignedKeyResponseXml =
        quick_xml::de::from_str(xml).map_err(|e| CodecError::Xml(e.to_string()))?;
    Ok(Response {
        id: parsed.id,
        serial: parsed.serial,
        domain: parsed.domain,
        timestamp: parsed.timestamp,
        ksk_policy: policy_from_xml(parsed.ksk)?,
        bundles: parsed.bundles.into_iter().map(bundle_from_xml).collect::<Result<_, _>>()?,
    })
}

/// Serialize a [`Response`] back into SKR XML.
pub fn encode_response(response: &Response) -> Result<String, CodecError> {
    let xml = SignedKeyResponseXml {
        id: response.id.clone(),
        serial: response.serial,
        domain: response.domain.clone(),
        timestamp: response.timestamp,
        ksk: policy_to_xml(&response.ksk_policy),
        bundles: response.bundles.iter().map(bundle_to_xml).collect(),
    };
    quick_xml::se::to_string(&xml).map_err(|e| CodecError::Xml(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_KSR: &str = r#"<KeySigningRequest>
  <Id>ksr-1</Id>
  <Serial>1</Serial>
  <Domain>.</Domain>
  <Timestamp>2024-01-01T00:00:00Z</Timestamp>
  <ZSK>
    <PublishSafety>P5D</PublishSafety>
    <RetireSafety>P5D</RetireSafety>
    <MaxSignatureValidity>P21D</MaxSignatureValidity>
    <MinSignatureValidity>P14D</MinSignatureValidity>
    <MaxValidityOverlap>P11D</MaxValidityOverlap>
    <MinValidityOverlap>P9D</MinValidityOverlap>
    <SignatureAlgorithm algorithm="8">
      <RSA size="2048" exponent="65537"/>
    </SignatureAlgorithm>
  </ZSK>
  <RequestBundle>
    <Id>bundle-1</Id>
    <Inception>2024-01-01T00:00:00Z</Inception>
    <Expiration>2024-01-21T00:00:00Z</Expiration>
    <Key>
      <KeyIdentifier>zsk-1</KeyIdentifier>
      <Flags>256</Flags>
      <Protocol>3</Protocol>
      <Algorithm>8</Algorithm>
      <PublicKey>AQEB</PublicKey>
    </Key>
    <Signature>
      <KeyIdentifier>zsk-1</KeyIdentifier>
      <Algorithm>8</Algorithm>
      <KeyTag>1</KeyTag>
      <SignersName>.</SignersName>
      <SignatureInception>2024-01-01T00:00:00Z</SignatureInception>
      <SignatureExpiration>2024-01-15T00:00:00Z</SignatureExpiration>
      <SignatureData>AAAA</SignatureData>
    </Signature>
  </RequestBundle>
</KeySigningRequest>"#;

    #[test]
    fn decodes_a_minimal_ksr_document() {
        let request = decode_request(SAMPLE_KSR).unwrap();
        assert_eq!(request.id, "ksr-1");
        assert_eq!(request.bundles.len(), 1);
        assert_eq!(request.bundles[0].keys[0].key_identifier, "zsk-1");
        assert_eq!(request.zsk_policy.algorithms.len(), 1);
        assert!(matches!(
            request.zsk_policy.algorithms[0],
            AlgorithmPolicy::Rsa { bits: 2048, exponent: 65537, .. }
        ));
    }

    #[test]
    fn rejects_malformed_base64_public_key() {
        let broken = SAMPLE_KSR.replace("AQEB", "not-base64!!");
        let err = decode_request(&broken).unwrap_err();
        assert!(matches!(err, CodecError::Base64(_)));
    }
}
