mod common;

use std::sync::Arc;

use binrw::Endian;
use pretty_assertions::assert_eq;
use unity_bundle::{
    error::{Error, Result},
    serialized::{BlobMap, ClassRef, SerializedFile},
    value::{ArrayValue, Value},
    ByteView,
};

use common::{node, streamed_bytes, streamed_nodes, text_asset_bytes, text_asset_nodes, SerializedBuilder};

fn parse(bytes: Vec<u8>) -> Result<SerializedFile> {
    SerializedFile::parse("level0", ByteView::new(bytes), Arc::new(BlobMap::new()))
}

#[test]
fn extended_header_values_are_adopted() -> Result<()> {
    let builder = SerializedBuilder {
        extended: Some((64, 4096, 128)),
        ..SerializedBuilder::new(22)
    };

    let file = parse(builder.build())?;
    assert_eq!(file.header.metadata_size, 64);
    assert_eq!(file.header.file_size, 4096);
    assert_eq!(file.header.data_offset, 128);
    assert_eq!(file.endian(), Endian::Little);

    Ok(())
}

#[test]
fn extended_header_disagreeing_with_header_fails() {
    let builder = SerializedBuilder {
        prefix: Some((0, 0, 128)),
        extended: Some((64, 4096, 256)),
        ..SerializedBuilder::new(22)
    };

    assert!(matches!(
        parse(builder.build()),
        Err(Error::HeaderInconsistency {
            field: "data_offset",
            header: 128,
            extended: 256
        })
    ));
}

#[test]
fn every_supported_version_decodes_the_same_object() -> Result<()> {
    for version in 5..=22 {
        let bytes = SerializedBuilder::new(version)
            .class(49, text_asset_nodes())
            .object(12, 0, text_asset_bytes("notes", &[1, 2, 3], -5))
            .build();

        let file = parse(bytes)?;
        assert_eq!(file.version(), version);
        assert_eq!(file.externals.len(), 1, "version {version}");
        assert_eq!(file.externals[0].path_name, "library/unity default resources");

        let object = file.object(12).ok_or(Error::ObjectNotFound(12))?;
        assert_eq!(file.object_type(object), Some("TextAsset"));
        assert_eq!(object.data.len(), object.byte_size as usize);

        let value = file.decode(object)?;
        assert_eq!(value.type_name, "TextAsset");
        assert_eq!(value.get("m_Name").and_then(|v| v.as_str()), Some("notes"));
        assert_eq!(
            value.get("m_Script").and_then(|v| v.as_bytes()),
            Some(&[1, 2, 3][..])
        );
        assert_eq!(value.get("m_Count").and_then(|v| v.as_i64()), Some(-5));
    }

    Ok(())
}

#[test]
fn version_gated_records() -> Result<()> {
    let file = parse(
        SerializedBuilder::new(15)
            .class(49, text_asset_nodes())
            .object(3, 0, text_asset_bytes("a", &[], 0))
            .build(),
    )?;
    let object = file.object(3).ok_or(Error::ObjectNotFound(3))?;
    assert_eq!(object.class, ClassRef::Legacy { type_id: 49, class_id: 49 });
    assert_eq!(object.stripped, Some(0));
    assert_eq!(object.script_type_index, Some(-1));
    assert_eq!(object.destroyed, None);
    assert_eq!(file.script_types[0].path_id, 42);
    assert_eq!(file.unity_version, "2019.4.0f1");
    assert_eq!(file.target_platform, 5);

    let file = parse(
        SerializedBuilder::new(21)
            .class(114, text_asset_nodes())
            .object(3, 0, text_asset_bytes("a", &[], 0))
            .build(),
    )?;
    let class = &file.classes[0];
    assert_eq!(class.script_hash, Some([0xAB; 16]));
    assert_eq!(class.type_hash, Some([0xCD; 16]));
    assert_eq!(class.dependencies, vec![0]);
    assert_eq!(file.object(3).map(|o| o.class), Some(ClassRef::Index(0)));

    let file = parse(
        SerializedBuilder::new(10)
            .class(49, text_asset_nodes())
            .object(3, 0, text_asset_bytes("a", &[], 0))
            .build(),
    )?;
    assert_eq!(file.object(3).and_then(|o| o.destroyed), Some(0));
    assert_eq!(file.target_platform, 5);
    assert_eq!(file.classes[0].type_hash, None);

    Ok(())
}

#[test]
fn plain_and_annotated_shapes_agree() -> Result<()> {
    let file = parse(
        SerializedBuilder::new(17)
            .class(49, text_asset_nodes())
            .object(9, 0, text_asset_bytes("twice", &[7; 6], 1))
            .build(),
    )?;

    let annotated = file.decode_by_path_id(9)?;
    let again = file.decode_by_path_id(9)?;
    assert_eq!(annotated, again);

    let plain = file.decode_plain_by_path_id(9)?;
    let Value::Struct(fields) = &plain.0 else {
        panic!("expected a struct, got {plain:?}");
    };
    assert_eq!(
        fields.keys().collect::<Vec<_>>(),
        vec!["m_Name", "m_Script", "m_Count"]
    );
    assert_eq!(
        fields["m_Script"].0,
        Value::Array(ArrayValue::UInt8(ByteView::new(vec![7; 6])))
    );
    assert_eq!(annotated.get("m_Script").map(|v| v.endian), Some(Endian::Little));

    Ok(())
}

#[test]
fn unknown_path_id_is_reported() -> Result<()> {
    let file = parse(SerializedBuilder::new(17).class(49, text_asset_nodes()).build())?;

    assert!(matches!(
        file.decode_by_path_id(99),
        Err(Error::ObjectNotFound(99))
    ));

    Ok(())
}

#[test]
fn objects_without_type_trees_have_unknown_layout() -> Result<()> {
    let builder = SerializedBuilder {
        has_type_trees: false,
        ..SerializedBuilder::new(17)
    }
    .class(28, Vec::new())
    .object(1, 0, vec![0; 8]);

    let file = parse(builder.build())?;
    let object = file.object(1).ok_or(Error::ObjectNotFound(1))?;
    assert_eq!(file.object_type(object), Some("Texture2D"));
    assert!(matches!(
        file.decode(object),
        Err(Error::MissingTypeTree { class_id: 28 })
    ));

    Ok(())
}

#[test]
fn schema_with_skipped_depth_only_fails_its_objects() -> Result<()> {
    let nodes = vec![node(0, "Thing", "Base", -1), node(2, "int", "m_Deep", 4)];
    let bytes = SerializedBuilder::new(17)
        .class(49, text_asset_nodes())
        .class(1, nodes)
        .object(12, 0, text_asset_bytes("kept", b"ok", 3))
        .object(13, 1, vec![0; 4])
        .build();

    let file = parse(bytes)?;
    let healthy = file.decode_plain_by_path_id(12)?;
    assert_eq!(healthy.get("m_Count").and_then(|v| v.as_i64()), Some(3));

    let broken = file.object(13).ok_or(Error::ObjectNotFound(13))?;
    assert_eq!(file.object_type(broken), Some("Thing"));
    assert!(matches!(
        file.decode(broken),
        Err(Error::UnimplementedSchemaCase(reason)) if reason.contains("m_Deep")
    ));

    Ok(())
}

#[test]
fn truncated_extended_header_is_out_of_bounds() {
    #[rustfmt::skip]
    let input = vec![
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x11,
        0x00, 0x00, 0x00, 0x16,
        0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    assert!(matches!(
        parse(input),
        Err(Error::OutOfBounds {
            position: 20,
            needed: 28,
            len: 17
        })
    ));
}

#[test]
fn truncated_prefix_is_out_of_bounds() {
    assert!(matches!(
        parse(vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x00]),
        Err(Error::OutOfBounds {
            position: 0,
            needed: 16,
            len: 6
        })
    ));
}

#[test]
fn streaming_info_without_blob_is_null() -> Result<()> {
    let file = parse(
        SerializedBuilder::new(17)
            .class(28, streamed_nodes())
            .object(
                1,
                0,
                streamed_bytes("tex", 0, 4, "archive:/level0/level0.resS"),
            )
            .build(),
    )?;

    let value = file.decode_by_path_id(1)?;
    assert!(value.get("m_StreamData").is_some_and(|v| v.is_null()));

    Ok(())
}

#[test]
fn streaming_info_resolves_with_a_blob() -> Result<()> {
    let bytes = SerializedBuilder::new(17)
        .class(28, streamed_nodes())
        .object(1, 0, streamed_bytes("tex", 10, 4, "archive:/level0/level0"))
        .build();
    let mut blobs = BlobMap::new();
    blobs.insert("level0".into(), ByteView::new((0u8..20).collect::<Vec<_>>()));

    let file = SerializedFile::parse("level0", ByteView::new(bytes), Arc::new(blobs))?;
    let value = file.decode_plain_by_path_id(1)?;
    assert_eq!(
        value.get("m_StreamData").and_then(|v| v.as_bytes()),
        Some(&[10, 11, 12, 13][..])
    );

    Ok(())
}
