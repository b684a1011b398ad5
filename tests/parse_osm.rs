use std::{fs, io, path::PathBuf};

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use osm_xml_stream::{
    parse, parse_file, Bounds, Element, ElementMetadata, Error, ErrorKind, GrammarError, Member,
    MemberType, OsmData, OsmMetadata, Point, Result, Tags, DEFAULT_CHUNK_SIZE,
};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/test1.osm")
}

fn parse_str(xml: &str) -> Vec<Result<OsmData>> {
    parse([Ok::<_, io::Error>(xml.as_bytes())]).collect()
}

fn metadata(id: i64) -> ElementMetadata {
    ElementMetadata {
        id,
        user: Some("foo".to_string()),
        uid: 1,
        timestamp: Utc.with_ymd_and_hms(2014, 5, 14, 14, 12, 39).unwrap(),
        visible: true,
        version: 1,
        changeset: 1,
    }
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn parses_a_complete_document() {
    let records: Vec<_> = parse_file(fixture(), DEFAULT_CHUNK_SIZE)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    let kinds: Vec<_> = records.iter().map(OsmData::kind).collect();
    assert_eq!(kinds, vec!["metadata", "node", "node", "way", "relation"]);

    assert_eq!(
        records[0],
        OsmData::Metadata(OsmMetadata {
            version: Some("0.6".to_string()),
            generator: Some("manual".to_string()),
            bounds: Some(Bounds {
                min_point: Point::new(53.5646, 10.0155).unwrap(),
                max_point: Point::new(53.5707, 10.0314).unwrap(),
            }),
        })
    );

    let OsmData::Node(first) = &records[1] else {
        panic!("expected a node, got {:?}", records[1]);
    };
    assert_eq!(first.metadata, metadata(1));
    assert_eq!(first.point, Point::new(53.12345, 10.2345).unwrap());
    assert!(first.tags.is_empty());

    let OsmData::Node(second) = &records[2] else {
        panic!("expected a node, got {:?}", records[2]);
    };
    assert_eq!(second.metadata, metadata(2));
    assert_eq!(second.point, Point::new(54.23456, 11.5432).unwrap());
    assert_eq!(second.tags, tags(&[("foo", "bar"), ("wibble", "wobble")]));

    let OsmData::Way(way) = &records[3] else {
        panic!("expected a way, got {:?}", records[3]);
    };
    assert_eq!(way.nds().to_vec(), vec![1, 2]);
    assert_eq!(records[3].element().unwrap().tags(), &tags(&[("highway", "motorway")]));
    assert!(!way.is_faulty());
    assert!(!way.is_closed());

    let OsmData::Relation(relation) = &records[4] else {
        panic!("expected a relation, got {:?}", records[4]);
    };
    assert_eq!(relation.metadata, metadata(4));
    assert_eq!(
        relation.members,
        vec![
            Member::new(MemberType::Node, 1, Some("thing".to_string())),
            Member::new(MemberType::Way, 3, None),
            Member::new(MemberType::Relation, 666, Some("dark-satanic".to_string())),
        ]
    );
    assert_eq!(relation.tags, tags(&[("route", "secret")]));
}

#[test]
fn parses_xz_compressed_files() {
    use std::io::Write;

    let plain = fs::read(fixture()).unwrap();
    let file = tempfile::Builder::new().suffix(".osm.xz").tempfile().unwrap();
    let mut encoder = xz::write::XzEncoder::new(file.as_file(), 6);
    encoder.write_all(&plain).unwrap();
    encoder.finish().unwrap();

    let expected: Vec<_> = parse_file(fixture(), DEFAULT_CHUNK_SIZE)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    let records: Vec<_> = parse_file(file.path(), 7)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(records, expected);
}

#[test]
fn bounds_only_document_yields_metadata() {
    let records = parse_str(
        r#"<osm version="0.6" generator="m"><bounds minlat="1" minlon="2" maxlat="3" maxlon="4"/></osm>"#,
    );

    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].as_ref().unwrap(),
        &OsmData::Metadata(OsmMetadata {
            version: Some("0.6".to_string()),
            generator: Some("m".to_string()),
            bounds: Some(Bounds {
                min_point: Point::new(1.0, 2.0).unwrap(),
                max_point: Point::new(3.0, 4.0).unwrap(),
            }),
        })
    );
}

#[test]
fn document_without_bounds_has_no_metadata_record() {
    assert!(parse_str(r#"<osm version="0.6"></osm>"#).is_empty());
    assert!(parse_str("<osm/>").is_empty());
}

#[test]
fn non_numeric_nd_ref_stops_the_sequence() {
    let xml = r#"<osm><bounds minlat="1" minlon="2" maxlat="3" maxlon="4"/>
        <way id="3" visible="true" version="1" changeset="1" timestamp="2014-05-14T14:12:39Z" uid="1">
          <nd ref="abc"/>
        </way>
        <relation id="4" visible="true" version="1" changeset="1" timestamp="2014-05-14T14:12:39Z" uid="1"/>
      </osm>"#;
    let records = parse_str(xml);

    assert_eq!(records.len(), 2);
    assert!(records[0].is_ok());
    let err = records[1].as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Grammar);
    assert!(matches!(
        err,
        Error::Grammar(GrammarError::InvalidAttribute { element, attribute: "ref", value })
            if element == "nd" && value == "abc"
    ));
}

#[test]
fn unknown_member_type_is_a_grammar_error() {
    let xml = r#"<osm><bounds minlat="1" minlon="2" maxlat="3" maxlon="4"/>
        <relation id="4" visible="true" version="1" changeset="1" timestamp="2014-05-14T14:12:39Z" uid="1">
          <member type="foo" ref="1" role=""/>
        </relation>
      </osm>"#;
    let records = parse_str(xml);

    assert!(matches!(
        records.last(),
        Some(Err(Error::Grammar(GrammarError::UnknownMemberType { value }))) if value == "foo"
    ));
}

#[test]
fn bounds_missing_an_attribute_is_named() {
    let records = parse_str(r#"<osm><bounds minlat="1" minlon="2" maxlat="3"/></osm>"#);

    assert_eq!(records.len(), 1);
    let err = records[0].as_ref().unwrap_err();
    assert_eq!(err.to_string(), "element `bounds` is missing attribute `maxlon`");
}

const ATTRIBUTES: &str =
    r#"visible="true" version="1" changeset="1" timestamp="2014-05-14T14:12:39Z" uid="1""#;

fn element_with_tags(kind: &str, count: usize) -> String {
    let tags: String = (0..count)
        .map(|i| format!(r#"<tag k="k{i}" v="v{i}"/>"#))
        .collect();
    let (extra, children) = match kind {
        "node" => (r#" lat="1" lon="2""#, String::new()),
        "way" => ("", r#"<nd ref="1"/><nd ref="2"/>"#.to_string()),
        _ => ("", r#"<member type="node" ref="1" role="stop"/>"#.to_string()),
    };
    format!(
        r#"<osm><bounds minlat="1" minlon="2" maxlat="3" maxlon="4"/><{kind} id="7" {ATTRIBUTES}{extra}>{children}{tags}</{kind}></osm>"#
    )
}

#[test]
fn tag_counts_follow_the_document() {
    for kind in ["node", "way", "relation"] {
        for count in [0, 1, 5] {
            let records = parse_str(&element_with_tags(kind, count));

            assert_eq!(records.len(), 2, "{kind} with {count} tags: {records:?}");
            let Some(Ok(record)) = records.get(1) else {
                panic!("expected a {kind}, got {records:?}");
            };
            assert_eq!(record.kind(), kind);
            let element = record.element().unwrap();
            assert_eq!(element.tags().len(), count, "{kind} with {count} tags");
            for i in 0..count {
                assert_eq!(element.tags().get(&format!("k{i}")), Some(&format!("v{i}")));
            }
        }
    }
}

#[test]
fn tags_after_children_keep_the_children() {
    let records = parse_str(&element_with_tags("way", 5));
    let Some(Ok(OsmData::Way(way))) = records.get(1) else {
        panic!("expected a way, got {records:?}");
    };
    assert_eq!(way.nds(), &[1, 2]);

    let records = parse_str(&element_with_tags("relation", 1));
    let Some(Ok(OsmData::Relation(relation))) = records.get(1) else {
        panic!("expected a relation, got {records:?}");
    };
    assert_eq!(relation.members.len(), 1);
    assert_eq!(relation.members[0].role.as_deref(), Some("stop"));
}

#[test]
fn byte_order_mark_is_ignored_in_single_byte_chunks() {
    let xml = concat!(
        "\u{feff}<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
        r#"<osm><bounds minlat="1" minlon="2" maxlat="3" maxlon="4"/></osm>"#,
    );
    let chunks: Vec<io::Result<Vec<u8>>> = xml.bytes().map(|byte| Ok(vec![byte])).collect();
    let records = parse(chunks).collect::<Result<Vec<_>>>().unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind(), "metadata");
    assert_eq!(records, parse_str(xml).into_iter().collect::<Result<Vec<_>>>().unwrap());
}

#[test]
fn non_utf8_documents_are_rejected() {
    let records = parse_str(r#"<?xml version="1.0" encoding="windows-1252"?><osm/>"#);
    assert_eq!(records.len(), 1);
    assert!(matches!(
        &records[0],
        Err(Error::UnsupportedEncoding { encoding }) if encoding == "windows-1252"
    ));
}

#[test]
fn malformed_xml_is_reported_after_the_records_before_it() {
    let xml = r#"<osm><bounds minlat="1" minlon="2" maxlat="3" maxlon="4"/></bounds>"#;
    let records = parse_str(xml);

    assert_eq!(records.len(), 2);
    assert!(records[0].is_ok());
    assert_eq!(records[1].as_ref().unwrap_err().kind(), ErrorKind::MalformedXml);
}

#[test]
fn truncated_document_is_malformed() {
    let records = parse_str(r#"<osm><bounds minlat="1" minlon="2" maxlat="3" maxlon="4"/>"#);
    assert!(matches!(records.last(), Some(Err(Error::Truncated { element })) if element == "osm"));
}

#[test]
fn source_failure_is_an_io_error() {
    let chunks: Vec<io::Result<&[u8]>> = vec![
        Ok(&br#"<osm><bounds minlat="1" minlon="2" maxlat="3" maxlon="4"/>"#[..]),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
    ];
    let records: Vec<_> = parse(chunks).collect();

    assert_eq!(records.len(), 2);
    assert!(records[0].is_ok());
    assert!(matches!(
        &records[1],
        Err(Error::Io(cause)) if cause.kind() == io::ErrorKind::ConnectionReset
    ));
}

#[test]
fn unknown_elements_are_fatal() {
    let records = parse_str("<osm><changeset id=\"1\"/></osm>");
    assert!(matches!(
        records.last(),
        Some(Err(Error::Grammar(GrammarError::UnexpectedStartElement { element, .. }))) if element == "changeset"
    ));
}
