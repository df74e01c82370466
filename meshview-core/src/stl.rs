//! STL loader for binary and ASCII files

use nalgebra::{Point3, Vector3};
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::opt,
    multi::many0,
    number::complete::{double, le_f32, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{Result, ViewerError};
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh> {
    if data.len() < HEADER_LEN + 4 {
        return Err(ViewerError::StlTooShort(data.len()));
    }

    let (body, count) = binary_header(data).map_err(|_| ViewerError::StlTooShort(data.len()))?;
    let expected = count as usize;
    let actual = body.len() / FACET_LEN;
    if actual < expected {
        return Err(ViewerError::StlTruncated { expected, actual });
    }

    let mut mesh = Mesh::with_capacity(expected);
    let mut input = body;
    for _ in 0..expected {
        let (rest, triangle) = binary_facet(input).map_err(|_| ViewerError::StlTruncated {
            expected,
            actual: mesh.triangles.len(),
        })?;
        mesh.add_triangle(triangle);
        input = rest;
    }

    Ok(mesh)
}

fn binary_header(input: &[u8]) -> IResult<&[u8], u32> {
    preceded(take(HEADER_LEN), le_u32)(input)
}

fn binary_vector(input: &[u8]) -> IResult<&[u8], Vector3<f64>> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Vector3::new(x as f64, y as f64, z as f64)))
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, normal) = binary_vector(input)?;
    let (input, (a, b, c)) = tuple((binary_vector, binary_vector, binary_vector))(input)?;
    // Attribute byte count is ignored
    let (input, _) = take(2usize)(input)?;
    let vertex = |p: Vector3<f64>| Vertex::new(Point3::from(p), normal);
    Ok((input, Triangle::new(vertex(a), vertex(b), vertex(c))))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh> {
    match ascii_solid(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(ViewerError::StlAscii(format!("{e:?}"))),
    }
}

fn ascii_solid(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // optional name
    let (input, triangles) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = opt(not_line_ending)(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn ascii_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = ascii_vector(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, (a, b, c)) = tuple((ascii_vertex, ascii_vertex, ascii_vertex))(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    let vertex = |p: Vector3<f64>| Vertex::new(Point3::from(p), normal);
    Ok((input, Triangle::new(vertex(a), vertex(b), vertex(c))))
}

fn ascii_vertex(input: &str) -> IResult<&str, Vector3<f64>> {
    preceded(preceded(multispace0, tag("vertex")), ascii_vector)(input)
}

fn ascii_vector(input: &str) -> IResult<&str, Vector3<f64>> {
    let (input, x) = preceded(multispace1, double)(input)?;
    let (input, y) = preceded(multispace1, double)(input)?;
    let (input, z) = preceded(multispace1, double)(input)?;
    Ok((input, Vector3::new(x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
///
/// Some binary exporters also start their header with `solid`, so a failed
/// ASCII parse falls back to binary.
pub fn parse_stl(data: &[u8]) -> Result<Mesh> {
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            match parse_ascii_stl(text) {
                Ok(mesh) => return Ok(mesh),
                Err(e) => log::debug!("not an ASCII STL, trying binary: {e}"),
            }
        }
    }

    parse_binary_stl(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn binary_stl(triangles: &[[[f32; 3]; 4]], declared: u32) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&declared.to_le_bytes());
        for facet in triangles {
            for v in facet {
                for c in v {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let data = binary_stl(&[], 0);
        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_parse_binary_facet() {
        let data = binary_stl(
            &[[
                [0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
            ]],
            1,
        );
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        let t = &mesh.triangles[0];
        assert_relative_eq!(t.vertices[1].position, Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(t.vertices[0].normal, Vector3::z());
    }

    #[test]
    fn test_binary_too_short() {
        assert!(matches!(
            parse_binary_stl(&[0u8; 10]),
            Err(ViewerError::StlTooShort(10))
        ));
    }

    #[test]
    fn test_binary_truncated() {
        let data = binary_stl(&[], 3);
        assert!(matches!(
            parse_binary_stl(&data),
            Err(ViewerError::StlTruncated {
                expected: 3,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_parse_ascii() {
        let text = "solid part\n\
            facet normal 0 0 1\n\
              outer loop\n\
                vertex 0 0 0\n\
                vertex 3.5 0 0\n\
                vertex 0 -2e-1 0\n\
              endloop\n\
            endfacet\n\
            endsolid part\n";
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_relative_eq!(mesh.triangles[0].vertices[1].position.x, 3.5);
        assert_relative_eq!(mesh.triangles[0].vertices[2].position.y, -0.2);
    }

    #[test]
    fn test_solid_prefixed_binary_falls_back() {
        let mut data = binary_stl(
            &[[
                [0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
            ]],
            1,
        );
        data[..5].copy_from_slice(b"solid");
        assert_eq!(parse_stl(&data).unwrap().triangles.len(), 1);
    }
}
