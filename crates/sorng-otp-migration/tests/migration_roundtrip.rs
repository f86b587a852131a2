use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::SeedableRng;

use sorng_otp_migration::migration::{
    self, base32, CodecOptions, CredentialRecord, MigrationCodec, MigrationErrorKind,
};

fn sample_records() -> Vec<CredentialRecord> {
    vec![
        CredentialRecord::new("GitHub", "alice@example.com", "JBSWY3DPEHPK3PXP"),
        CredentialRecord::new("AWS", "bob@work.com", "ABCDEFGHIJKLMNOP"),
        CredentialRecord::new("Google", "carol@gmail.com", "GEZDGNBVGY3TQOJQ"),
    ]
}

#[test]
fn export_then_import() {
    let records = sample_records();
    let uri = migration::encode(&records, &mut StdRng::seed_from_u64(1)).unwrap();
    assert!(migration::is_migration_uri(&uri));

    let imported = migration::decode(&uri).unwrap();
    assert_eq!(imported.len(), records.len());
    for (original, back) in records.iter().zip(&imported) {
        assert!(original.same_credential(back));
        assert_ne!(original.id, back.id);
    }
}

#[test]
fn imported_ids_are_fresh_every_time() {
    let uri = migration::encode(&sample_records(), &mut StepRng::new(3, 0)).unwrap();
    let a = migration::decode(&uri).unwrap();
    let b = migration::decode(&uri).unwrap();
    assert!(a.iter().zip(&b).all(|(x, y)| x.id != y.id && x.same_credential(y)));
}

#[test]
fn malformed_input_collapses_to_empty() {
    for input in [
        "",
        "not-a-uri",
        "otpauth-migration://offline?data=",
        "otpauth-migration://offline?data=!!!notbase64!!!",
        "otpauth://totp/Example:alice?secret=JBSWY3DPEHPK3PXP",
    ] {
        assert!(migration::decode_or_empty(input).is_empty(), "input {:?}", input);
    }
}

#[test]
fn typed_errors_for_each_failure() {
    let cases = [
        ("not-a-uri", MigrationErrorKind::MalformedUri),
        ("otpauth-migration://offline", MigrationErrorKind::MissingDataParameter),
        ("otpauth-migration://offline?data=%%%", MigrationErrorKind::MalformedBase64),
        // "EAE=" is field 2 = 1 only: metadata with no entries.
        ("otpauth-migration://offline?data=EAE%3D", MigrationErrorKind::EmptyResult),
    ];
    for (input, kind) in cases {
        assert_eq!(migration::decode(input).unwrap_err().kind, kind, "input {:?}", input);
    }
}

#[test]
fn known_google_authenticator_export() {
    // Single entry: secret "Hello!\xde\xad\xbe\xef", name "alice", issuer "Ex",
    // SHA1, six digits, TOTP, version 1, batch 1/1, id 0.
    let uri = "otpauth-migration://offline?data=Ch0KCkhlbGxvId6tvu8SBWFsaWNlGgJFeCABKAEwAhABGAEgACgA";
    let records = migration::decode(uri).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].issuer, "Ex");
    assert_eq!(records[0].account, "alice");
    assert_eq!(records[0].secret, "JBSWY3DPEHPK3PXP");
}

#[test]
fn custom_limits_apply() {
    let codec = MigrationCodec::new(CodecOptions::default().with_max_records(2));
    let err = codec
        .encode(&sample_records(), &mut StepRng::new(0, 0))
        .unwrap_err();
    assert_eq!(err.kind, MigrationErrorKind::InputTooLarge);

    let uri = migration::encode(&sample_records(), &mut StepRng::new(0, 0)).unwrap();
    assert!(codec.decode_or_empty(&uri).is_empty());
    assert_eq!(MigrationCodec::default().decode(&uri).unwrap().len(), 3);
}

#[test]
fn base32_lenient_import_strict_export() {
    assert_eq!(base32::decode("jbsw y3dp ehpk 3pxp"), b"Hello!\xde\xad\xbe\xef");
    assert!(base32::decode_strict("JBSW!Y3DP").is_err());

    let record = CredentialRecord::new("X", "y", "jbsw y3dp-ehpk 3pxp");
    let uri = migration::encode(&[record], &mut StepRng::new(0, 0)).unwrap();
    assert_eq!(migration::decode(&uri).unwrap()[0].secret, "JBSWY3DPEHPK3PXP");
}
