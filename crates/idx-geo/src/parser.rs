//! Recursive-descent parser turning an EWKT token stream into a [`Geometry`].

use crate::{
    ast::{Coord, Geometry},
    error::ParseError,
    lexer::Token,
};

/// Parses a full EWKT string (optional `SRID=n;` prefix plus one geometry).
pub fn parse(tokens: &[Token]) -> Result<(Option<u32>, Geometry), ParseError> {
    let mut parser = Parser { tokens, pos: 0 };
    let srid = parser.take_srid_prefix()?;
    let geometry = parser.parse_geometry()?;
    if parser.pos != parser.tokens.len() {
        return Err(ParseError::new("unexpected trailing tokens", Some(parser.pos)));
    }
    Ok((srid, geometry))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ParseError> {
        match self.bump() {
            Some(tok) if tok == expected => Ok(()),
            other => Err(ParseError::new(
                format!("expected {what}, found {other:?}"),
                Some(self.pos),
            )),
        }
    }

    fn take_srid_prefix(&mut self) -> Result<Option<u32>, ParseError> {
        if let Some(Token::Srid(n)) = self.peek() {
            let n = *n;
            self.bump();
            self.expect(&Token::Semicolon, "';' after SRID")?;
            Ok(Some(n))
        } else {
            Ok(None)
        }
    }

    fn take_tag(&mut self) -> Result<String, ParseError> {
        match self.bump() {
            Some(Token::Word(w)) => Ok(w.clone()),
            other => Err(ParseError::new(format!("expected a geometry tag, found {other:?}"), Some(self.pos))),
        }
    }

    fn is_empty_keyword(&mut self) -> bool {
        if let Some(Token::Word(w)) = self.peek() {
            if w == "EMPTY" {
                self.bump();
                return true;
            }
        }
        false
    }

    fn take_number(&mut self) -> Result<f64, ParseError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(*n),
            other => Err(ParseError::new(format!("expected a number, found {other:?}"), Some(self.pos))),
        }
    }

    fn take_coord(&mut self) -> Result<Coord, ParseError> {
        let lon = self.take_number()?;
        let lat = self.take_number()?;
        let height = match self.peek() {
            Some(Token::Number(_)) => Some(self.take_number()?),
            _ => None,
        };
        Ok(Coord { lon, lat, height })
    }

    /// Parses `(` item `,` item ... `)` using the given item parser.
    fn parse_paren_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        self.expect(&Token::LParen, "'('")?;
        let mut items = vec![item(self)?];
        while matches!(self.peek(), Some(Token::Comma)) {
            self.bump();
            items.push(item(self)?);
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(items)
    }

    fn parse_ring(&mut self) -> Result<Vec<Coord>, ParseError> {
        self.parse_paren_list(Self::take_coord)
    }

    fn parse_circle_body(&mut self) -> Result<(Coord, f64), ParseError> {
        self.expect(&Token::LParen, "'('")?;
        let coord = self.take_coord()?;
        self.expect(&Token::Comma, "','")?;
        let radius = self.take_number()?;
        self.expect(&Token::RParen, "')'")?;
        Ok((coord, radius))
    }

    fn parse_geometry(&mut self) -> Result<Geometry, ParseError> {
        let tag = self.take_tag()?;

        if self.is_empty_keyword() {
            return Ok(Geometry::Empty);
        }

        Ok(match tag.as_str() {
            "POINT" => {
                self.expect(&Token::LParen, "'('")?;
                let coord = self.take_coord()?;
                self.expect(&Token::RParen, "')'")?;
                Geometry::Point(coord)
            }
            "MULTIPOINT" => Geometry::MultiPoint(self.parse_paren_list(Self::take_coord)?),
            "CIRCLE" => {
                let (coord, radius) = self.parse_circle_body()?;
                Geometry::Circle(coord, radius)
            }
            "MULTICIRCLE" => Geometry::MultiCircle(self.parse_paren_list(Self::parse_circle_body)?),
            "CONVEX" => Geometry::Convex(self.parse_ring()?),
            "MULTICONVEX" => Geometry::MultiConvex(self.parse_paren_list(Self::parse_ring)?),
            "POLYGON" => Geometry::Polygon(self.parse_paren_list(Self::parse_ring)?),
            "MULTIPOLYGON" => {
                Geometry::MultiPolygon(self.parse_paren_list(|p| p.parse_paren_list(Self::parse_ring))?)
            }
            "CHULL" => Geometry::Chull(self.parse_ring()?),
            "MULTICHULL" => Geometry::MultiChull(self.parse_paren_list(Self::parse_ring)?),
            "GEOMETRYCOLLECTION" => Geometry::Collection(self.parse_paren_list(Self::parse_geometry)?),
            "GEOMETRYINTERSECTION" => {
                Geometry::Intersection(self.parse_paren_list(Self::parse_geometry)?)
            }
            other => return Err(ParseError::new(format!("unknown geometry tag {other:?}"), Some(self.pos))),
        })
    }
}
