//! EIP-712 digest vectors

use super::*;

const MAIL: &str = r#"{
    "types": {
        "EIP712Domain": [
            {"name": "name", "type": "string"},
            {"name": "version", "type": "string"},
            {"name": "chainId", "type": "uint256"},
            {"name": "verifyingContract", "type": "address"}
        ],
        "Person": [
            {"name": "name", "type": "string"},
            {"name": "wallet", "type": "address"}
        ],
        "Mail": [
            {"name": "from", "type": "Person"},
            {"name": "to", "type": "Person"},
            {"name": "contents", "type": "string"}
        ]
    },
    "primaryType": "Mail",
    "domain": {
        "name": "Ether Mail",
        "version": "1",
        "chainId": 1,
        "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
    },
    "message": {
        "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
        "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
        "contents": "Hello, Bob!"
    }
}"#;

#[test]
fn test_mail_example_digest() {
    let typed_data = TypedData::from_json(MAIL).unwrap();
    let digest = typed_data_digest(&typed_data).unwrap();

    assert_eq!(
        hex::encode(digest.domain_separator),
        "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
    );
    assert_eq!(
        hex::encode(digest.struct_hash),
        "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
    );
    assert_eq!(
        hex::encode(digest.digest),
        "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
    );
    assert_eq!(hash_typed_data(&typed_data).unwrap(), digest.digest);
}

#[test]
fn test_implied_domain_matches_declared() {
    let declared = TypedData::from_json(MAIL).unwrap();
    let mut implied = declared.clone();
    implied.types.remove(DOMAIN_TYPE);

    assert_eq!(
        hash_typed_data(&declared).unwrap(),
        hash_typed_data(&implied).unwrap()
    );
}

/// Struct arrays, a signed field, a hex chain id and mixed number encodings
#[test]
fn test_struct_array_order_digest() {
    let json = r#"{
        "types": {
            "Item": [
                {"name": "id", "type": "uint256"},
                {"name": "name", "type": "string"}
            ],
            "Order": [
                {"name": "items", "type": "Item[]"},
                {"name": "buyer", "type": "address"},
                {"name": "delta", "type": "int64"}
            ]
        },
        "primaryType": "Order",
        "domain": {"name": "Marketplace", "chainId": "0x89"},
        "message": {
            "items": [
                {"id": 1, "name": "Widget"},
                {"id": "2", "name": "Gadget"}
            ],
            "buyer": "0x1234567890123456789012345678901234567890",
            "delta": -5
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    let digest = typed_data_digest(&typed_data).unwrap();

    assert_eq!(
        hex::encode(digest.domain_separator),
        "77fd2d3730dc3b7b2c7ddc3d2fbab25e0805e7350537c35ff6cbac525b688873"
    );
    assert_eq!(
        hex::encode(digest.struct_hash),
        "6c62103d542ffd70327127e716e3f195ea4a13f76d40f7b5fe7d048c738dd077"
    );
    assert_eq!(
        hex::encode(digest.digest),
        "aed67f3a1bf38f859ace2833e690d123c82a739b36e9cb8df7a7cff1f3b0cb7c"
    );
}

#[test]
fn test_seaport_order_components() {
    let json = r#"{
        "types": {
            "OrderComponents": [
                {"name": "offerer", "type": "address"},
                {"name": "zone", "type": "address"},
                {"name": "orderType", "type": "uint8"},
                {"name": "startTime", "type": "uint256"},
                {"name": "endTime", "type": "uint256"},
                {"name": "zoneHash", "type": "bytes32"},
                {"name": "salt", "type": "uint256"},
                {"name": "conduitKey", "type": "bytes32"},
                {"name": "counter", "type": "uint256"}
            ]
        },
        "primaryType": "OrderComponents",
        "domain": {
            "name": "Seaport",
            "version": "1.1",
            "chainId": 1,
            "verifyingContract": "0x00000000006c3852cbEf3e08E8dF289169EdE581"
        },
        "message": {
            "offerer": "0x1234567890123456789012345678901234567890",
            "zone": "0x0000000000000000000000000000000000000000",
            "orderType": 0,
            "startTime": 1640000000,
            "endTime": 1893456000,
            "zoneHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
            "salt": "24446860302761739304752683030156737591518664810215442929818227897836383814680",
            "conduitKey": "0x0000007b02230091a7ed01230072f7006a004d60a8d4e71d599b8104250f0000",
            "counter": 0
        }
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    let first = hash_typed_data(&typed_data).unwrap();

    let mut bumped = typed_data.clone();
    bumped.message["counter"] = serde_json::json!(1);
    assert_ne!(first, hash_typed_data(&bumped).unwrap());
}

#[test]
fn test_invalid_primary_type() {
    let json = r#"{
        "types": {"Person": [{"name": "name", "type": "string"}]},
        "primaryType": "NonExistent",
        "domain": {"name": "Test"},
        "message": {}
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    assert!(matches!(
        hash_typed_data(&typed_data).unwrap_err(),
        Eip712Error::InvalidPrimaryType(_)
    ));
}

#[test]
fn test_unknown_field_type() {
    let json = r#"{
        "types": {"Ping": [{"name": "who", "type": "Pong"}]},
        "primaryType": "Ping",
        "domain": {"name": "Test"},
        "message": {"who": {}}
    }"#;

    let typed_data = TypedData::from_json(json).unwrap();
    assert!(matches!(
        typed_data.validate().unwrap_err(),
        Eip712Error::InvalidType(t) if t == "Pong"
    ));
}

#[test]
fn test_chain_id_parsing() {
    let cases = [
        (serde_json::json!(1), Some(1)),
        (serde_json::json!("137"), Some(137)),
        (serde_json::json!("0x89"), Some(137)),
        (serde_json::json!(true), None),
    ];
    for (value, expected) in cases {
        let domain = Eip712Domain {
            chain_id: Some(value),
            ..Default::default()
        };
        assert_eq!(domain.chain_id_u64(), expected);
    }
}
