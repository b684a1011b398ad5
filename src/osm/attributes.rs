use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::data::osm::{ElementMetadata, Point};
use crate::data::xml::StartElement;
use crate::errors::{GrammarError, Result};

pub(crate) fn required<'a>(
    start: &'a StartElement,
    attribute: &'static str,
) -> Result<&'a str, GrammarError> {
    start
        .attribute(attribute)
        .ok_or_else(|| GrammarError::MissingAttribute {
            element: start.local_name.clone(),
            attribute,
        })
}

pub(crate) fn required_parsed<T: FromStr>(
    start: &StartElement,
    attribute: &'static str,
) -> Result<T, GrammarError> {
    let value = required(start, attribute)?;
    value.parse().map_err(|_| invalid(start, attribute, value))
}

fn invalid(start: &StartElement, attribute: &'static str, value: &str) -> GrammarError {
    GrammarError::InvalidAttribute {
        element: start.local_name.clone(),
        attribute,
        value: value.to_string(),
    }
}

fn read_timestamp(start: &StartElement) -> Result<DateTime<Utc>, GrammarError> {
    let value = required(start, "timestamp")?;
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid(start, "timestamp", value))
}

fn read_visible(start: &StartElement) -> Result<bool, GrammarError> {
    match required(start, "visible")? {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(start, "visible", other)),
    }
}

/// Reads the attributes every node, way and relation carries. `user` is the
/// only optional one.
pub(crate) fn read_element_metadata(start: &StartElement) -> Result<ElementMetadata> {
    Ok(ElementMetadata {
        id: required_parsed(start, "id")?,
        user: start.attribute("user").map(str::to_string),
        uid: required_parsed(start, "uid")?,
        timestamp: read_timestamp(start)?,
        visible: read_visible(start)?,
        version: required_parsed(start, "version")?,
        changeset: required_parsed(start, "changeset")?,
    })
}

pub(crate) fn read_point(
    start: &StartElement,
    lat_attribute: &'static str,
    lon_attribute: &'static str,
) -> Result<Point> {
    let lat = required_parsed(start, lat_attribute)?;
    let lon = required_parsed(start, lon_attribute)?;
    Ok(Point::new(lat, lon)?)
}
