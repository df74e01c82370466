//! PLY loader for ASCII and binary (little or big endian) files.
//!
//! Vertex positions and face index lists are read; every other property and
//! element is parsed and skipped. Polygons are fan-triangulated.

use nalgebra::Point3;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{line_ending, not_line_ending, space0, space1, u64 as decimal},
    combinator::{map, value},
    multi::many0,
    number::{complete as number, Endianness},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Result, ViewerError};
use crate::geometry::{Mesh, Triangle};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Encoding {
    Ascii,
    Binary(Endianness),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

#[derive(Debug, Clone, PartialEq)]
enum Property {
    Scalar { name: String, ty: Scalar },
    List { name: String, count: Scalar, item: Scalar },
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
enum HeaderLine {
    Element(String, usize),
    Property(Property),
    Comment,
}

fn ply_error(message: impl Into<String>) -> ViewerError {
    ViewerError::Ply(message.into())
}

/// Parse a PLY file
pub fn parse_ply(data: &[u8]) -> Result<Mesh> {
    let (body, (encoding, lines)) = header(data).map_err(|_| ply_error("malformed header"))?;
    let elements = build_elements(lines)?;

    let mut values = match encoding {
        Encoding::Ascii => {
            let text = std::str::from_utf8(body).map_err(|_| ply_error("ASCII body is not UTF-8"))?;
            Values::Ascii(text.split_ascii_whitespace())
        }
        Encoding::Binary(endian) => Values::Binary {
            input: body,
            endian,
        },
    };

    let mut positions = Vec::new();
    let mut mesh = Mesh::new();
    for element in &elements {
        match element.name.as_str() {
            "vertex" => positions = read_vertices(element, &mut values)?,
            "face" => read_faces(element, &positions, &mut values, &mut mesh)?,
            _ => {
                log::debug!("skipping PLY element {} ({} rows)", element.name, element.count);
                skip_element(element, &mut values)?;
            }
        }
    }

    Ok(mesh)
}

fn name(input: &[u8]) -> IResult<&[u8], String> {
    map(
        take_while1(|c: u8| c.is_ascii_alphanumeric() || c == b'_' || c == b'-'),
        |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned(),
    )(input)
}

// Longer spellings first: "int" is a prefix of "int8".
fn scalar(input: &[u8]) -> IResult<&[u8], Scalar> {
    alt((
        value(Scalar::I8, alt((tag("int8"), tag("char")))),
        value(Scalar::U8, alt((tag("uint8"), tag("uchar")))),
        value(Scalar::I16, alt((tag("int16"), tag("short")))),
        value(Scalar::U16, alt((tag("uint16"), tag("ushort")))),
        value(Scalar::I32, alt((tag("int32"), tag("int")))),
        value(Scalar::U32, alt((tag("uint32"), tag("uint")))),
        value(Scalar::F32, alt((tag("float32"), tag("float")))),
        value(Scalar::F64, alt((tag("float64"), tag("double")))),
    ))(input)
}

fn property(input: &[u8]) -> IResult<&[u8], Property> {
    preceded(
        tuple((tag("property"), space1)),
        alt((
            map(
                tuple((tag("list"), space1, scalar, space1, scalar, space1, name)),
                |(_, _, count, _, item, _, name)| Property::List { name, count, item },
            ),
            map(tuple((scalar, space1, name)), |(ty, _, name)| {
                Property::Scalar { name, ty }
            }),
        )),
    )(input)
}

fn element(input: &[u8]) -> IResult<&[u8], (String, usize)> {
    map(
        tuple((tag("element"), space1, name, space1, decimal)),
        |(_, _, name, _, count)| (name, count as usize),
    )(input)
}

fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), tuple((alt((tag("comment"), tag("obj_info"))), not_line_ending)))(input)
}

fn header_line(input: &[u8]) -> IResult<&[u8], HeaderLine> {
    terminated(
        alt((
            map(element, |(name, count)| HeaderLine::Element(name, count)),
            map(property, HeaderLine::Property),
            value(HeaderLine::Comment, comment),
        )),
        tuple((space0, line_ending)),
    )(input)
}

fn encoding(input: &[u8]) -> IResult<&[u8], Encoding> {
    delimited(
        tuple((tag("format"), space1)),
        alt((
            value(Encoding::Ascii, tag("ascii")),
            value(
                Encoding::Binary(Endianness::Little),
                tag("binary_little_endian"),
            ),
            value(Encoding::Binary(Endianness::Big), tag("binary_big_endian")),
        )),
        tuple((not_line_ending, line_ending)),
    )(input)
}

fn header(input: &[u8]) -> IResult<&[u8], (Encoding, Vec<HeaderLine>)> {
    let (input, _) = tuple((tag("ply"), space0, line_ending))(input)?;
    let (input, _) = many0(terminated(comment, line_ending))(input)?;
    let (input, encoding) = encoding(input)?;
    let (input, lines) = many0(header_line)(input)?;
    let (input, _) = tuple((tag("end_header"), space0, line_ending))(input)?;
    Ok((input, (encoding, lines)))
}

fn build_elements(lines: Vec<HeaderLine>) -> Result<Vec<Element>> {
    let mut elements: Vec<Element> = Vec::new();
    for line in lines {
        match line {
            HeaderLine::Element(name, count) => elements.push(Element {
                name,
                count,
                properties: Vec::new(),
            }),
            HeaderLine::Property(property) => elements
                .last_mut()
                .ok_or_else(|| ply_error("property declared before any element"))?
                .properties
                .push(property),
            HeaderLine::Comment => {}
        }
    }
    Ok(elements)
}

/// Body values in file order
enum Values<'a> {
    Ascii(std::str::SplitAsciiWhitespace<'a>),
    Binary { input: &'a [u8], endian: Endianness },
}

impl Values<'_> {
    fn next(&mut self, ty: Scalar) -> Result<f64> {
        match self {
            Values::Ascii(tokens) => {
                let token = tokens
                    .next()
                    .ok_or_else(|| ply_error("unexpected end of data"))?;
                token
                    .parse::<f64>()
                    .map_err(|_| ply_error(format!("invalid number {token:?}")))
            }
            Values::Binary { input, endian } => {
                let (rest, value) = binary_scalar(input, ty, *endian)
                    .map_err(|_| ply_error("unexpected end of data"))?;
                *input = rest;
                Ok(value)
            }
        }
    }

    fn list(&mut self, count: Scalar, item: Scalar) -> Result<Vec<f64>> {
        let len = self.next(count)?;
        if !(len >= 0.0) || len.fract() != 0.0 {
            return Err(ply_error(format!("invalid list length {len}")));
        }
        (0..len as usize).map(|_| self.next(item)).collect()
    }

    fn skip(&mut self, property: &Property) -> Result<()> {
        match property {
            Property::Scalar { ty, .. } => self.next(*ty).map(drop),
            Property::List { count, item, .. } => self.list(*count, *item).map(drop),
        }
    }
}

fn binary_scalar(input: &[u8], ty: Scalar, endian: Endianness) -> IResult<&[u8], f64> {
    match ty {
        Scalar::I8 => map(number::i8, f64::from)(input),
        Scalar::U8 => map(number::u8, f64::from)(input),
        Scalar::I16 => map(number::i16(endian), f64::from)(input),
        Scalar::U16 => map(number::u16(endian), f64::from)(input),
        Scalar::I32 => map(number::i32(endian), f64::from)(input),
        Scalar::U32 => map(number::u32(endian), f64::from)(input),
        Scalar::F32 => map(number::f32(endian), f64::from)(input),
        Scalar::F64 => number::f64(endian)(input),
    }
}

fn read_vertices(element: &Element, values: &mut Values) -> Result<Vec<Point3<f64>>> {
    let column = |axis: &str| {
        element
            .properties
            .iter()
            .position(|p| matches!(p, Property::Scalar { name, .. } if name == axis))
    };
    let (Some(x), Some(y), Some(z)) = (column("x"), column("y"), column("z")) else {
        return Err(ply_error("vertex element lacks x, y or z"));
    };

    let mut positions = Vec::with_capacity(element.count.min(1 << 20));
    let mut row = vec![0.0; element.properties.len()];
    for _ in 0..element.count {
        for (slot, property) in row.iter_mut().zip(&element.properties) {
            match property {
                Property::Scalar { ty, .. } => *slot = values.next(*ty)?,
                list => values.skip(list)?,
            }
        }
        positions.push(Point3::new(row[x], row[y], row[z]));
    }
    Ok(positions)
}

fn read_faces(
    element: &Element,
    positions: &[Point3<f64>],
    values: &mut Values,
    mesh: &mut Mesh,
) -> Result<()> {
    let indices_column = element.properties.iter().position(|p| {
        matches!(p, Property::List { name, .. } if name == "vertex_indices" || name == "vertex_index")
    });
    let Some(indices_column) = indices_column else {
        return Err(ply_error("face element lacks vertex_indices"));
    };

    let corner = |index: f64| {
        positions
            .get(index as usize)
            .filter(|_| index >= 0.0)
            .copied()
            .ok_or_else(|| ply_error(format!("face index {index} out of range")))
    };

    for _ in 0..element.count {
        let mut polygon = Vec::new();
        for (i, property) in element.properties.iter().enumerate() {
            match property {
                Property::List { count, item, .. } if i == indices_column => {
                    polygon = values.list(*count, *item)?;
                }
                other => values.skip(other)?,
            }
        }
        if polygon.len() < 3 {
            continue;
        }
        let first = corner(polygon[0])?;
        for pair in polygon[1..].windows(2) {
            mesh.add_triangle(Triangle::from_points(first, corner(pair[0])?, corner(pair[1])?));
        }
    }
    Ok(())
}

fn skip_element(element: &Element, values: &mut Values) -> Result<()> {
    for _ in 0..element.count {
        for property in &element.properties {
            values.skip(property)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_SQUARE: &str = "ply
format ascii 1.0
comment unit square in the XY plane
element vertex 4
property float x
property float y
property float z
property uchar red
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255
1 0 0 255
1 1 0 255
0 1 0 255
4 0 1 2 3
";

    fn binary_triangle(endian: Endianness) -> Vec<u8> {
        let format = match endian {
            Endianness::Big => "binary_big_endian",
            _ => "binary_little_endian",
        };
        let mut data = format!(
            "ply\nformat {format} 1.0\nelement vertex 3\nproperty float x\nproperty float y\n\
             property float z\nelement face 1\nproperty list uchar uint vertex_index\n\
             element edge 1\nproperty int vertex1\nproperty int vertex2\nend_header\n"
        )
        .into_bytes();
        let floats = [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        let words = |bytes: &mut Vec<u8>, v: u32| match endian {
            Endianness::Big => bytes.extend_from_slice(&v.to_be_bytes()),
            _ => bytes.extend_from_slice(&v.to_le_bytes()),
        };
        for f in floats {
            words(&mut data, f.to_bits());
        }
        data.push(3);
        for i in 0..3 {
            words(&mut data, i);
        }
        words(&mut data, 0);
        words(&mut data, 1);
        data
    }

    #[test]
    fn test_ascii_quad_is_fan_triangulated() {
        let mesh = parse_ply(ASCII_SQUARE.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.triangles[1].positions()[2], Point3::new(0.0, 1.0, 0.0));
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_binary_little_endian() {
        let mesh = parse_ply(&binary_triangle(Endianness::Little)).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].positions()[1], Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_binary_big_endian() {
        let mesh = parse_ply(&binary_triangle(Endianness::Big)).unwrap();
        assert_eq!(mesh.triangles[0].positions()[2], Point3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_out_of_range_face_index() {
        let text = ASCII_SQUARE.replace("4 0 1 2 3", "3 0 1 9");
        assert!(matches!(parse_ply(text.as_bytes()), Err(ViewerError::Ply(_))));
    }

    #[test]
    fn test_truncated_body() {
        let text = ASCII_SQUARE.replace("4 0 1 2 3\n", "");
        assert!(matches!(parse_ply(text.as_bytes()), Err(ViewerError::Ply(_))));
    }

    #[test]
    fn test_not_a_ply_file() {
        assert!(matches!(parse_ply(b"solid cube\n"), Err(ViewerError::Ply(_))));
    }
}
