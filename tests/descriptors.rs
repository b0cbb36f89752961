mod common;

use common::es_descriptor_bytes;
use mp4tree::cursor::ByteCursor;
use mp4tree::descriptors::{parse_descriptor, DescriptorBody};

#[test]
fn full_es_chain_decodes() {
    let bytes = es_descriptor_bytes();
    let mut cur = ByteCursor::new(&bytes);
    let desc = parse_descriptor(&mut cur).unwrap();

    assert_eq!(desc.tag, 0x03);
    assert_eq!(desc.tag_name, "ES_Descr");
    let DescriptorBody::Es(es) = &desc.body else { panic!("not an ES descriptor") };
    assert_eq!(es.es_id, 1);
    assert_eq!(es.stream_priority, 0);
    assert_eq!(es.depends_on_es_id, None);
    assert_eq!(es.url, None);
    assert_eq!(es.ocr_es_id, None);

    let config = es.decoder_config.as_ref().unwrap();
    let DescriptorBody::DecoderConfig(dc) = &config.body else { panic!() };
    assert_eq!(dc.object_type_id, 0x40);
    assert_eq!(dc.object_type_label, Some("MPEG-4 audio"));
    assert_eq!(dc.stream_type, 5);
    assert!(!dc.up_stream);
    assert_eq!(dc.max_bitrate, 0x0001_7700);
    assert_eq!(dc.avg_bitrate, 0x0001_2C00);

    let specific = dc.decoder_specific.as_ref().unwrap();
    let DescriptorBody::DecoderSpecific { data } = &specific.body else { panic!() };
    assert_eq!(data, "1210");

    let sl = es.sl_config.as_ref().unwrap();
    assert!(matches!(sl.body, DescriptorBody::SlConfig { predefined: 2 }));

    // The whole chain was consumed.
    assert_eq!(cur.remaining(), 0);
}

#[test]
fn continuation_bytes_pad_the_length_field() {
    // Three 0x80 extension bytes before the real length.
    let bytes = [
        0x06, // SLConfigDescr
        0x80, 0x80, 0x80, // extension padding
        0x01, // length
        0x02, // predefined
    ];
    let mut cur = ByteCursor::new(&bytes);
    let desc = parse_descriptor(&mut cur).unwrap();
    assert_eq!(desc.size, 1);
    assert!(matches!(desc.body, DescriptorBody::SlConfig { predefined: 2 }));
}

#[test]
fn flag_gated_es_fields_are_read_in_order() {
    // dependsOn (0x80) + URL (0x40) + OCR (0x20), priority 9.
    let mut payload = vec![
        0x00, 0x05, // es_id
        0xE9, // all three flags + priority 9
        0x00, 0x02, // depends_on_es_id
        0x03, b'u', b'r', b'l', // 3-byte URL
        0x00, 0x07, // ocr_es_id
    ];
    let mut bytes = vec![0x03, payload.len() as u8];
    bytes.append(&mut payload);

    let mut cur = ByteCursor::new(&bytes);
    let desc = parse_descriptor(&mut cur).unwrap();
    let DescriptorBody::Es(es) = &desc.body else { panic!() };
    assert_eq!(es.es_id, 5);
    assert_eq!(es.stream_priority, 9);
    assert_eq!(es.depends_on_es_id, Some(2));
    assert_eq!(es.url.as_deref(), Some("url"));
    assert_eq!(es.ocr_es_id, Some(7));
    assert!(es.decoder_config.is_none());
}

#[test]
fn unknown_tags_still_parse_structurally() {
    let bytes = [
        0x0D, // RegistrationDescr: structurally parsed, not interpreted
        0x03, // length
        0xAA, 0xBB, 0xCC,
        0x06, 0x01, 0x02, // a following descriptor must still be reachable
    ];
    let mut cur = ByteCursor::new(&bytes);

    let first = parse_descriptor(&mut cur).unwrap();
    assert_eq!(first.tag_name, "RegistrationDescr");
    let DescriptorBody::Unknown { data } = &first.body else { panic!() };
    assert_eq!(data, "aabbcc");

    let second = parse_descriptor(&mut cur).unwrap();
    assert_eq!(second.tag, 0x06);
}

#[test]
fn truncated_descriptor_is_an_error_not_a_hang() {
    // Declared length 10 with only 2 payload bytes available.
    let bytes = [0x03, 0x0A, 0x00, 0x01];
    let mut cur = ByteCursor::new(&bytes);
    assert!(parse_descriptor(&mut cur).is_err());
}
