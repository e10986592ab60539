//! Coordinate reference model and the linear sky transform
//!
//! A `CoordinateReference` is the per-extension bundle of axis metadata
//! read from a header: reference pixels and values, increments, axis
//! types and units, the CD/PC linear matrix, SIP distortion polynomials
//! and the spectral/time reference values. The cutout engine rewrites a
//! few of its fields after a cut and the shape resolver reads it to find
//! which axis does what.
//!
//! Sky geometry goes through the `PixelConverter` trait so a full
//! projection library can be plugged in. The bundled `LinearWcs` is a
//! small-field linear mapping about the reference point with optional SIP
//! correction, which is the coordinate family this engine supports.

use log::{debug, warn};

use crate::fits::errors::{CutoutError, CutoutResult};
use crate::fits::header::Header;
use crate::fits::keywords::{self, names};

/// How the linear matrix was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixForm {
    /// CDi_j: increments folded into the matrix
    Cd,
    /// PCi_j: rotation only, scaled by CDELTn
    Pc,
}

impl MatrixForm {
    /// Keyword prefix for this form
    pub fn prefix(&self) -> &'static str {
        match self {
            MatrixForm::Cd => "CD",
            MatrixForm::Pc => "PC",
        }
    }
}

/// The linear coordinate matrix, sparse, in keyword order
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMatrix {
    /// Declared form
    pub form: MatrixForm,
    /// (world axis i, pixel axis j, value), sorted by (i, j)
    pub elements: Vec<(usize, usize, f64)>,
}

impl LinearMatrix {
    /// Matrix element for (i, j), defaulting to the identity
    pub fn element(&self, i: usize, j: usize) -> f64 {
        for &(ei, ej, value) in &self.elements {
            if ei == i && ej == j {
                return value;
            }
        }
        if i == j { 1.0 } else { 0.0 }
    }
}

/// SIP distortion polynomials
///
/// Terms are (p, q, coefficient) triplets for coeff * u^p * v^q. The
/// reference offset pair tracks the spatial reference pixel and is the
/// only part of the distortion a cutout rewrites.
#[derive(Debug, Clone, PartialEq)]
pub struct SipDistortion {
    /// Forward polynomial terms for the first spatial axis
    pub a: Vec<(u32, u32, f64)>,
    /// Forward polynomial terms for the second spatial axis
    pub b: Vec<(u32, u32, f64)>,
    /// Inverse polynomial terms, first spatial axis, often absent
    pub ap: Vec<(u32, u32, f64)>,
    /// Inverse polynomial terms, second spatial axis, often absent
    pub bp: Vec<(u32, u32, f64)>,
    /// Reference offset pair the polynomials are centered on
    pub crpix: [f64; 2],
}

/// What a coordinate axis measures, judged from its CTYPE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    /// Celestial longitude (RA, GLON, ELON)
    SpatialLon,
    /// Celestial latitude (DEC, GLAT, ELAT)
    SpatialLat,
    /// Spectral quantity (frequency, wavelength, energy, velocity)
    Spectral,
    /// Time
    Time,
    /// Stokes/polarization
    Polarization,
    /// Anything else
    Other,
}

/// Classifies a CTYPE string
pub fn axis_kind(ctype: &str) -> AxisKind {
    let upper = ctype.trim().to_uppercase();
    let base = upper.split('-').next().unwrap_or("");
    match base {
        "RA" | "GLON" | "ELON" | "HLON" | "SLON" => AxisKind::SpatialLon,
        "DEC" | "GLAT" | "ELAT" | "HLAT" | "SLAT" => AxisKind::SpatialLat,
        "FREQ" | "WAVE" | "AWAV" | "ENER" | "WAVN" | "VRAD" | "VOPT" | "VELO" | "ZOPT"
        | "BETA" => AxisKind::Spectral,
        "TIME" | "UTC" | "TAI" | "TT" | "MJD" | "GPS" | "ET" => AxisKind::Time,
        "STOKES" => AxisKind::Polarization,
        _ => AxisKind::Other,
    }
}

/// Per-extension coordinate reference metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateReference {
    /// Declared coordinate axis count (WCSAXES, else NAXIS)
    pub naxis: usize,
    /// Reference pixel per axis, 1-based pixel units
    pub crpix: Vec<f64>,
    /// World value at the reference pixel per axis
    pub crval: Vec<f64>,
    /// World increment per pixel per axis
    pub cdelt: Vec<f64>,
    /// Axis type string per axis
    pub ctype: Vec<String>,
    /// Axis unit string per axis
    pub cunit: Vec<String>,
    /// Linear matrix, when declared
    pub matrix: Option<LinearMatrix>,
    /// SIP distortion, when declared
    pub sip: Option<SipDistortion>,
    /// Rest frequency in Hz, for velocity axes
    pub rest_frequency: Option<f64>,
    /// Time axis reference MJD, 0 when not declared
    pub time_reference: f64,
    /// Data axis lengths from the same header, for clipping
    pub axis_lengths: Vec<usize>,
}

impl CoordinateReference {
    /// Reads a coordinate reference from a header
    ///
    /// # Returns
    /// `Ok(None)` when the header declares no coordinate axes at all,
    /// the parsed reference otherwise
    pub fn from_header(header: &Header) -> CutoutResult<Option<Self>> {
        let axis_lengths = header.axis_lengths().unwrap_or_default();
        let declared = header
            .integer(names::WCSAXES)
            .unwrap_or(axis_lengths.len() as i64);
        if declared <= 0 {
            return Ok(None);
        }
        let naxis = declared as usize;
        if !header.contains("CTYPE1") && !header.contains("CRPIX1") && !header.contains("CRVAL1") {
            return Ok(None);
        }

        let mut crpix = Vec::with_capacity(naxis);
        let mut crval = Vec::with_capacity(naxis);
        let mut cdelt = Vec::with_capacity(naxis);
        let mut ctype = Vec::with_capacity(naxis);
        let mut cunit = Vec::with_capacity(naxis);
        for axis in 1..=naxis {
            crpix.push(header.real(&format!("{}{}", names::CRPIX, axis)).unwrap_or(0.0));
            crval.push(header.real(&format!("{}{}", names::CRVAL, axis)).unwrap_or(0.0));
            cdelt.push(header.real(&format!("{}{}", names::CDELT, axis)).unwrap_or(1.0));
            ctype.push(header.string(&format!("{}{}", names::CTYPE, axis)).unwrap_or_default());
            cunit.push(header.string(&format!("{}{}", names::CUNIT, axis)).unwrap_or_default());
        }

        let matrix = Self::read_matrix(header);
        let sip = Self::read_sip(header, &crpix);
        let rest_frequency = header
            .real(names::RESTFRQ)
            .or_else(|| header.real(names::RESTFREQ));
        let time_reference = header.real(names::MJDREF).unwrap_or_else(|| {
            header.real(names::MJDREFI).unwrap_or(0.0)
                + header.real(names::MJDREFF).unwrap_or(0.0)
        });

        Ok(Some(CoordinateReference {
            naxis,
            crpix,
            crval,
            cdelt,
            ctype,
            cunit,
            matrix,
            sip,
            rest_frequency,
            time_reference,
            axis_lengths,
        }))
    }

    /// Collects CD or PC matrix elements, CD taking precedence
    fn read_matrix(header: &Header) -> Option<LinearMatrix> {
        let mut cd = Vec::new();
        let mut pc = Vec::new();
        for card in header.cards() {
            if let Some((form, i, j)) = keywords::parse_matrix_keyword(&card.keyword) {
                if let Some(value) = card.value.as_real() {
                    match form {
                        "CD" => cd.push((i, j, value)),
                        _ => pc.push((i, j, value)),
                    }
                }
            }
        }
        let (form, mut elements) = if !cd.is_empty() {
            (MatrixForm::Cd, cd)
        } else if !pc.is_empty() {
            (MatrixForm::Pc, pc)
        } else {
            return None;
        };
        elements.sort_by_key(|&(i, j, _)| (i, j));
        Some(LinearMatrix { form, elements })
    }

    /// Collects SIP polynomial coefficients when the header declares them
    fn read_sip(header: &Header, crpix: &[f64]) -> Option<SipDistortion> {
        let sip_declared = header
            .string("CTYPE1")
            .map(|t| t.to_uppercase().ends_with("-SIP"))
            .unwrap_or(false)
            || header.contains(names::A_ORDER);
        if !sip_declared {
            return None;
        }

        let mut a = Vec::new();
        let mut b = Vec::new();
        let mut ap = Vec::new();
        let mut bp = Vec::new();
        for card in header.cards() {
            if let Some((family, p, q)) = keywords::parse_sip_keyword(&card.keyword) {
                if let Some(value) = card.value.as_real() {
                    match family.as_str() {
                        "A" => a.push((p, q, value)),
                        "B" => b.push((p, q, value)),
                        "AP" => ap.push((p, q, value)),
                        "BP" => bp.push((p, q, value)),
                        _ => {}
                    }
                }
            }
        }
        if a.is_empty() && b.is_empty() {
            warn!("SIP declared but no forward coefficients found");
            return None;
        }
        let reference = [
            crpix.first().copied().unwrap_or(0.0),
            crpix.get(1).copied().unwrap_or(0.0),
        ];
        Some(SipDistortion { a, b, ap, bp, crpix: reference })
    }

    /// Kind of each axis, indexed by 0-based axis number
    pub fn axis_kinds(&self) -> Vec<AxisKind> {
        self.ctype.iter().map(|t| axis_kind(t)).collect()
    }

    /// 1-based axis numbers of the spatial pair (longitude, latitude)
    pub fn spatial_axis_pair(&self) -> Option<(usize, usize)> {
        let kinds = self.axis_kinds();
        let lon = kinds.iter().position(|&k| k == AxisKind::SpatialLon)? + 1;
        let lat = kinds.iter().position(|&k| k == AxisKind::SpatialLat)? + 1;
        Some((lon, lat))
    }

    /// 1-based axis number of the first spectral axis
    pub fn spectral_axis(&self) -> Option<usize> {
        self.axis_kinds().iter().position(|&k| k == AxisKind::Spectral).map(|i| i + 1)
    }

    /// 1-based axis number of the first time axis
    pub fn time_axis(&self) -> Option<usize> {
        self.axis_kinds().iter().position(|&k| k == AxisKind::Time).map(|i| i + 1)
    }

    /// 1-based axis number of the polarization axis
    pub fn polarization_axis(&self) -> Option<usize> {
        self.axis_kinds().iter().position(|&k| k == AxisKind::Polarization).map(|i| i + 1)
    }

    /// Declared length of a 1-based axis, when the header carried one
    pub fn axis_length(&self, axis: usize) -> Option<usize> {
        self.axis_lengths.get(axis - 1).copied()
    }

    /// Effective linear increment for a 1-based axis
    ///
    /// CD-form matrices fold the increment into the diagonal; otherwise
    /// CDELTn is authoritative.
    pub fn axis_increment(&self, axis: usize) -> f64 {
        if let Some(matrix) = &self.matrix {
            if matrix.form == MatrixForm::Cd {
                let diag = matrix.element(axis, axis);
                if diag != 0.0 {
                    return diag;
                }
            }
        }
        self.cdelt.get(axis - 1).copied().unwrap_or(1.0)
    }
}

/// Sky transform between world and pixel coordinates
///
/// Implementations convert between (ra, dec) in degrees and 1-based pixel
/// coordinates on the spatial axis pair. Points a projection cannot reach
/// fail with an error; the resolver excludes such samples.
pub trait PixelConverter {
    /// World to pixel for the spatial pair
    fn world_to_pixel(&self, ra: f64, dec: f64) -> CutoutResult<(f64, f64)>;

    /// Pixel to world for the spatial pair
    fn pixel_to_world(&self, x: f64, y: f64) -> CutoutResult<(f64, f64)>;
}

/// Linear small-field sky transform with optional SIP correction
///
/// World offsets about the reference value relate to reference-relative
/// pixels through the 2x2 spatial block of the linear matrix, with the
/// longitude offset scaled by cos(dec) at the reference point. This is
/// exact for linear axis mappings and a close approximation near the
/// reference point for the common tangent-plane headers.
#[derive(Debug, Clone)]
pub struct LinearWcs {
    crpix: [f64; 2],
    crval: [f64; 2],
    matrix: [[f64; 2]; 2],
    inverse: [[f64; 2]; 2],
    cos_dec: f64,
    sip: Option<SipDistortion>,
}

impl LinearWcs {
    /// Builds the celestial sub-transform from a coordinate reference
    ///
    /// # Returns
    /// The transform, or an error when no spatial pair exists or the
    /// spatial matrix block is singular
    pub fn from_reference(reference: &CoordinateReference) -> CutoutResult<Self> {
        let (lon, lat) = reference.spatial_axis_pair().ok_or_else(|| {
            CutoutError::NoContent("header declares no spatial axis pair".to_string())
        })?;

        let matrix = Self::spatial_block(reference, lon, lat);
        let det = matrix[0][0] * matrix[1][1] - matrix[0][1] * matrix[1][0];
        if det == 0.0 || !det.is_finite() {
            return Err(CutoutError::ValidationError(
                "spatial coordinate matrix is singular".to_string()));
        }
        let inverse = [
            [matrix[1][1] / det, -matrix[0][1] / det],
            [-matrix[1][0] / det, matrix[0][0] / det],
        ];

        let crpix = [
            reference.crpix.get(lon - 1).copied().unwrap_or(0.0),
            reference.crpix.get(lat - 1).copied().unwrap_or(0.0),
        ];
        let crval = [
            reference.crval.get(lon - 1).copied().unwrap_or(0.0),
            reference.crval.get(lat - 1).copied().unwrap_or(0.0),
        ];
        let cos_dec = crval[1].to_radians().cos().max(1e-9);

        debug!("Linear sky transform on axes ({}, {}), det {:.3e}", lon, lat, det);
        Ok(LinearWcs {
            crpix,
            crval,
            matrix,
            inverse,
            cos_dec,
            sip: reference.sip.clone(),
        })
    }

    /// The 2x2 spatial block of the declared matrix
    fn spatial_block(reference: &CoordinateReference, lon: usize, lat: usize) -> [[f64; 2]; 2] {
        match &reference.matrix {
            Some(matrix) => {
                let scale = |axis: usize| match matrix.form {
                    MatrixForm::Cd => 1.0,
                    MatrixForm::Pc => reference.cdelt.get(axis - 1).copied().unwrap_or(1.0),
                };
                [
                    [scale(lon) * matrix.element(lon, lon), scale(lon) * matrix.element(lon, lat)],
                    [scale(lat) * matrix.element(lat, lon), scale(lat) * matrix.element(lat, lat)],
                ]
            }
            None => {
                let dlon = reference.cdelt.get(lon - 1).copied().unwrap_or(1.0);
                let dlat = reference.cdelt.get(lat - 1).copied().unwrap_or(1.0);
                [[dlon, 0.0], [0.0, dlat]]
            }
        }
    }

    fn apply_sip_forward(&self, u: f64, v: f64) -> (f64, f64) {
        match &self.sip {
            Some(sip) => (u + eval_poly(&sip.a, u, v), v + eval_poly(&sip.b, u, v)),
            None => (u, v),
        }
    }

    /// Undoes the SIP correction, preferring declared inverse polynomials
    /// and falling back to fixed-point iteration
    fn apply_sip_inverse(&self, up: f64, vp: f64) -> (f64, f64) {
        let sip = match &self.sip {
            Some(sip) => sip,
            None => return (up, vp),
        };
        if !sip.ap.is_empty() || !sip.bp.is_empty() {
            return (up + eval_poly(&sip.ap, up, vp), vp + eval_poly(&sip.bp, up, vp));
        }
        let mut u = up;
        let mut v = vp;
        for _ in 0..20 {
            let nu = up - eval_poly(&sip.a, u, v);
            let nv = vp - eval_poly(&sip.b, u, v);
            if (nu - u).abs() < 1e-10 && (nv - v).abs() < 1e-10 {
                return (nu, nv);
            }
            u = nu;
            v = nv;
        }
        (u, v)
    }
}

impl PixelConverter for LinearWcs {
    fn world_to_pixel(&self, ra: f64, dec: f64) -> CutoutResult<(f64, f64)> {
        if !(-90.0..=90.0).contains(&dec) {
            return Err(CutoutError::GenericError(format!(
                "declination {} outside the projection domain", dec)));
        }
        let dx = wrap_degrees(ra - self.crval[0]) * self.cos_dec;
        let dy = dec - self.crval[1];
        let up = self.inverse[0][0] * dx + self.inverse[0][1] * dy;
        let vp = self.inverse[1][0] * dx + self.inverse[1][1] * dy;
        let (u, v) = self.apply_sip_inverse(up, vp);
        let x = u + self.crpix[0];
        let y = v + self.crpix[1];
        if !(x.is_finite() && y.is_finite()) {
            return Err(CutoutError::GenericError(
                "world point does not project onto the pixel grid".to_string()));
        }
        Ok((x, y))
    }

    fn pixel_to_world(&self, x: f64, y: f64) -> CutoutResult<(f64, f64)> {
        let (u, v) = self.apply_sip_forward(x - self.crpix[0], y - self.crpix[1]);
        let dx = self.matrix[0][0] * u + self.matrix[0][1] * v;
        let dy = self.matrix[1][0] * u + self.matrix[1][1] * v;
        let ra = normalize_ra(self.crval[0] + dx / self.cos_dec);
        let dec = self.crval[1] + dy;
        if !(ra.is_finite() && dec.is_finite()) || !(-90.0..=90.0).contains(&dec) {
            return Err(CutoutError::GenericError(
                "pixel does not map to a valid sky position".to_string()));
        }
        Ok((ra, dec))
    }
}

/// Evaluates a SIP polynomial at (u, v)
fn eval_poly(terms: &[(u32, u32, f64)], u: f64, v: f64) -> f64 {
    terms
        .iter()
        .map(|&(p, q, coeff)| coeff * u.powi(p as i32) * v.powi(q as i32))
        .sum()
}

/// Wraps a longitude difference into [-180, 180)
fn wrap_degrees(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Normalizes a right ascension into [0, 360)
fn normalize_ra(ra: f64) -> f64 {
    ra.rem_euclid(360.0)
}
