//! OBJ subset parser: `v`, `vt`, `vn` and polygonal `f` records.

use std::{
    io::{self, BufRead},
    path::Path,
    str::SplitWhitespace,
};

use corelib::{DVec2, DVec3};

use crate::{error::LoadError, mesh::RawGeometry};

/// One corner of a face record, parsed once. Indices are 0-based.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FaceVertex {
    pub position: u32,
    pub texcoord: Option<u32>,
    pub normal: Option<u32>,
}

/// Parse an OBJ stream into its raw attribute and triangle lists.
///
/// The reader is consumed to the end; any malformed record aborts the parse.
pub fn parse<R: BufRead>(reader: R) -> Result<RawGeometry, LoadError> {
    parse_lines(reader, None)
}

/// Convenience helper to parse an OBJ string literal.
pub fn parse_str(contents: &str) -> Result<RawGeometry, LoadError> {
    parse(io::Cursor::new(contents))
}

/// Like [`parse`], with `path` used to label read failures.
pub fn parse_source<R: BufRead>(reader: R, path: &Path) -> Result<RawGeometry, LoadError> {
    parse_lines(reader, Some(path))
}

fn parse_lines<R: BufRead>(mut reader: R, path: Option<&Path>) -> Result<RawGeometry, LoadError> {
    let mut geometry = RawGeometry::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(|source| match path {
            Some(path) => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
            None => LoadError::Read(source),
        })?;
        if read == 0 {
            break;
        }
        line_no += 1;
        // Invalid UTF-8 only matters if it lands in a record we parse.
        let line = String::from_utf8_lossy(&buf);
        parse_line(&line, line_no, &mut geometry)?;
    }

    Ok(geometry)
}

fn parse_line(line: &str, line_no: usize, geometry: &mut RawGeometry) -> Result<(), LoadError> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("v") => {
            let [x, y, z] = parse_floats::<3>(&mut parts, line_no, "v")?;
            geometry.positions.push(DVec3::new(x, y, z));
        }
        Some("vt") => {
            let [u, v] = parse_floats::<2>(&mut parts, line_no, "vt")?;
            geometry.texcoords.push(DVec2::new(u, v));
        }
        Some("vn") => {
            let [x, y, z] = parse_floats::<3>(&mut parts, line_no, "vn")?;
            geometry.normals.push(DVec3::new(x, y, z));
        }
        Some("f") => {
            let corners = parts
                .map(|token| parse_face_vertex(token, line_no))
                .collect::<Result<Vec<_>, _>>()?;
            if corners.len() < 3 {
                return Err(LoadError::malformed(
                    line_no,
                    format!("face needs at least 3 vertices, found {}", corners.len()),
                ));
            }
            triangulate_fan(&corners, &mut geometry.indices);
        }
        // Blank lines, comments and unsupported directives (o/g/s/usemtl/...).
        _ => {}
    }
    Ok(())
}

/// Read the first `N` fields as floats. Extra trailing fields are ignored.
fn parse_floats<const N: usize>(
    parts: &mut SplitWhitespace<'_>,
    line_no: usize,
    tag: &str,
) -> Result<[f64; N], LoadError> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let token = parts.next().ok_or_else(|| {
            LoadError::malformed(
                line_no,
                format!("'{tag}' expects {N} numbers, found {i}"),
            )
        })?;
        *slot = token.parse::<f64>().map_err(|_| {
            LoadError::malformed(line_no, format!("'{token}' is not a number"))
        })?;
    }
    Ok(out)
}

fn parse_face_vertex(token: &str, line_no: usize) -> Result<FaceVertex, LoadError> {
    let mut split = token.split('/');
    let position = split
        .next()
        .ok_or_else(|| LoadError::malformed(line_no, format!("empty face element '{token}'")))?;
    let position = resolve_index(position, line_no)?;

    let texcoord = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, line_no)?),
        _ => None,
    };
    let normal = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, line_no)?),
        _ => None,
    };

    if split.next().is_some() {
        return Err(LoadError::malformed(
            line_no,
            format!("face element '{token}' has more than 3 parts"),
        ));
    }

    Ok(FaceVertex {
        position,
        texcoord,
        normal,
    })
}

/// Convert a 1-based index token to 0-based. Zero and negative values are rejected.
fn resolve_index(token: &str, line_no: usize) -> Result<u32, LoadError> {
    let raw = token
        .parse::<i32>()
        .map_err(|_| LoadError::malformed(line_no, format!("invalid index '{token}'")))?;
    if raw <= 0 {
        return Err(LoadError::malformed(
            line_no,
            format!("indices are 1-based and positive; found {raw}"),
        ));
    }
    Ok((raw - 1) as u32)
}

/// Fan-triangulate around the first corner, appending position indices.
fn triangulate_fan(corners: &[FaceVertex], indices: &mut Vec<i32>) {
    let anchor = corners[0].position as i32;
    for pair in corners[1..].windows(2) {
        indices.push(anchor);
        indices.push(pair[0].position as i32);
        indices.push(pair[1].position as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use corelib::{dvec2, dvec3};

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0 0 0
            v 1 0 0
            v 0 1 0
            f 1 2 3
        "#;
        let raw = parse_str(src).expect("parse triangle");
        assert_eq!(raw.positions.len(), 3);
        assert_eq!(raw.indices, vec![0, 1, 2]);
        assert!(raw.texcoords.is_empty());
        assert!(raw.normals.is_empty());
    }

    #[test]
    fn quad_is_split_into_two_triangles() {
        let raw = parse_str("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").expect("parse quad");
        assert_eq!(raw.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn ngon_fan_law() {
        for n in 3..=9usize {
            let corners: Vec<String> = (1..=n).map(|i| i.to_string()).collect();
            let src = format!("f {}", corners.join(" "));
            let raw = parse_str(&src).expect("parse ngon");
            assert_eq!(raw.triangle_count(), n - 2);
            for tri in raw.indices.chunks(3) {
                assert_eq!(tri[0], 0);
            }
        }
    }

    #[test]
    fn attributes_and_slashed_corners() {
        let src = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.25 0.75
vn 0.0 0.0 1.0
f 1/1/1 2//1 3/1
";
        let raw = parse_str(src).expect("parse");
        assert_eq!(raw.texcoords, vec![dvec2(0.25, 0.75)]);
        assert_eq!(raw.normals, vec![dvec3(0.0, 0.0, 1.0)]);
        assert_eq!(raw.indices, vec![0, 1, 2]);
    }

    #[test]
    fn face_vertex_parts() {
        assert_eq!(
            parse_face_vertex("3//2", 1).unwrap(),
            FaceVertex {
                position: 2,
                texcoord: None,
                normal: Some(1)
            }
        );
        assert_eq!(
            parse_face_vertex("4/5", 1).unwrap(),
            FaceVertex {
                position: 3,
                texcoord: Some(4),
                normal: None
            }
        );
        assert!(parse_face_vertex("1/2/3/4", 1).is_err());
        assert!(parse_face_vertex("/2/3", 1).is_err());
    }

    #[test]
    fn two_vertex_face_is_malformed() {
        let err = parse_str("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(matches!(err, LoadError::MalformedRecord { line: 3, .. }));
    }

    #[test]
    fn short_vertex_record_is_malformed() {
        let err = parse_str("v 1.0 2.0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        let err = parse_str("vt 1.0\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        let err = parse_str("vn 1 2 abc\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
    }

    #[test]
    fn zero_and_negative_indices_are_malformed() {
        assert!(parse_str("f 0 1 2").is_err());
        assert!(parse_str("f -1 -2 -3").is_err());
        assert!(parse_str("f 1 x 3").is_err());
    }

    #[test]
    fn extra_vertex_fields_are_ignored() {
        let raw = parse_str("v 1 2 3 1.0\nvt 0.5 0.5 0.0\n").expect("parse");
        assert_eq!(raw.positions, vec![dvec3(1.0, 2.0, 3.0)]);
        assert_eq!(raw.texcoords, vec![dvec2(0.5, 0.5)]);
    }

    #[test]
    fn unknown_directives_and_comments_are_skipped() {
        let src = "# comment\n\no cube\ng side\nusemtl red\ns off\nvp 0.1\nv 0 0 0\n";
        let raw = parse_str(src).expect("parse");
        assert_eq!(raw.positions.len(), 1);
    }

    #[test]
    fn tag_must_be_a_whole_token() {
        // `vx` is an unknown directive, not a malformed `v`.
        let raw = parse_str("vx 1\nfo 1 2\n").expect("parse");
        assert!(raw.positions.is_empty());
        assert!(raw.indices.is_empty());
    }

    #[test]
    fn invalid_utf8_in_ignored_lines_is_tolerated() {
        let src: &[u8] = b"# caf\xe9 model\r\ng n\xffme\nv 0 0 0\nv 1 0 0\r\nv 0 1 0\nf 1 2 3";
        let raw = parse(io::Cursor::new(src)).expect("parse");
        assert_eq!(raw.positions.len(), 3);
        assert_eq!(raw.indices, vec![0, 1, 2]);
    }

    #[test]
    fn invalid_utf8_in_a_record_is_malformed() {
        let err = parse(io::Cursor::new(&b"v 0 0 \xff\n"[..])).unwrap_err();
        assert!(matches!(err, LoadError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn unlabeled_read_failure_names_no_path() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }
        let err = parse(io::BufReader::new(Broken)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.to_string(), "failed to read stream: disk on fire");

        let err = parse_source(io::BufReader::new(Broken), Path::new("m.obj")).unwrap_err();
        assert_eq!(err.to_string(), "failed to read 'm.obj': disk on fire");
    }

    #[test]
    fn same_source_parses_identically() {
        let src = "v 0.1 0.2 0.3\nv 1 0 0\nv 0 1 0\nvt 0.3 0.4\nf 1 2 3\n";
        assert_eq!(parse_str(src).unwrap(), parse_str(src).unwrap());
    }
}
