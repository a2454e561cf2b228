//! Profile extraction from a multi-file archive.
//!
//! The query point is located once, on the grid of the first file needed.
//! Every file is then opened in turn, one at a time, and the columns at
//! the nearest grid node are read for the time steps inside the requested
//! interval. A time step already taken from an earlier file is skipped.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, warn};

use super::record::{Profile, ProfileRecord};
use super::rotation::AzimuthRotation;
use crate::archive::{ArchiveError, FileSelection, TimeIndexedSeries};
use crate::equations::{DensityModel, RHO_ANOMALY_OFFSET};
use crate::grid::{GridCell, GridCoordinateResolver, GridError, GridPosition, InversionConfig};
use crate::io::{Column, GridShape, GridSource, SourceError, SourceOpener, open_source};
use crate::progress::ProgressReporter;
use crate::vertical::VerticalLevels;

/// Error type for profile extraction.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Grid(#[from] GridError),

    /// A file's grid differs from the one the point was located on
    #[error("Grid of {locator} is {found}, expected {expected}")]
    InconsistentGrid {
        locator: String,
        expected: GridShape,
        found: GridShape,
    },
}

fn candidates(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Candidate variable names, tried in order.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableNames {
    pub temp: Vec<String>,
    pub salt: Vec<String>,
    pub u: Vec<String>,
    pub v: Vec<String>,
    /// Grid angle (radians)
    pub angle: Vec<String>,
    /// In-situ density
    pub dens: Vec<String>,
    /// Density anomaly, `rho - 1000`
    pub rho_anomaly: Vec<String>,
    pub zeta: Vec<String>,
    pub h: Vec<String>,
    pub mask_rho: Vec<String>,
    pub mask_u: Vec<String>,
    pub mask_v: Vec<String>,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            temp: candidates(&["temp", "temperature"]),
            salt: candidates(&["salt", "salinity"]),
            u: candidates(&["u"]),
            v: candidates(&["v"]),
            angle: candidates(&["angle"]),
            dens: candidates(&["dens", "density"]),
            rho_anomaly: candidates(&["rho"]),
            zeta: candidates(&["zeta"]),
            h: candidates(&["h"]),
            mask_rho: candidates(&["mask_rho"]),
            mask_u: candidates(&["mask_u"]),
            mask_v: candidates(&["mask_v"]),
        }
    }
}

impl VariableNames {
    pub fn with_temp(mut self, names: &[&str]) -> Self {
        self.temp = candidates(names);
        self
    }

    pub fn with_salt(mut self, names: &[&str]) -> Self {
        self.salt = candidates(names);
        self
    }

    pub fn with_velocity(mut self, u: &[&str], v: &[&str]) -> Self {
        self.u = candidates(u);
        self.v = candidates(v);
        self
    }

    pub fn with_angle(mut self, names: &[&str]) -> Self {
        self.angle = candidates(names);
        self
    }

    pub fn with_density(mut self, names: &[&str]) -> Self {
        self.dens = candidates(names);
        self
    }
}

/// Configuration for profile extraction.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub names: VariableNames,
    pub inversion: InversionConfig,
    /// Used when a file stores no density
    pub density_model: DensityModel,
    /// Log progress every N percent of files, 0 disables
    pub progress_interval_pct: u32,
    /// Opens files of series built by [`ProfileExtractor::extract`]
    pub opener: SourceOpener,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            names: VariableNames::default(),
            inversion: InversionConfig::default(),
            density_model: DensityModel::default(),
            progress_interval_pct: 10,
            opener: open_source,
        }
    }
}

impl ExtractConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(mut self, names: VariableNames) -> Self {
        self.names = names;
        self
    }

    pub fn with_inversion(mut self, inversion: InversionConfig) -> Self {
        self.inversion = inversion;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.inversion.cache_capacity = capacity;
        self
    }

    pub fn with_density_model(mut self, model: DensityModel) -> Self {
        self.density_model = model;
        self
    }

    pub fn with_progress_interval(mut self, pct: u32) -> Self {
        self.progress_interval_pct = pct;
        self
    }

    pub fn with_opener(mut self, opener: SourceOpener) -> Self {
        self.opener = opener;
        self
    }
}

/// Query point located on the grid.
#[derive(Debug, Clone, Copy)]
struct Target {
    position: GridPosition,
    cell: GridCell,
    shape: GridShape,
}

/// Extracts vertical profile time series from an archive.
#[derive(Debug, Default)]
pub struct ProfileExtractor {
    config: ExtractConfig,
    resolver: Option<GridCoordinateResolver>,
}

impl ProfileExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            resolver: None,
        }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Resolver of the most recent extraction.
    pub fn resolver(&self) -> Option<&GridCoordinateResolver> {
        self.resolver.as_ref()
    }

    /// Extract a profile from the files of `selection`.
    pub fn extract(
        &mut self,
        selection: &FileSelection,
        start: NaiveDateTime,
        stop: NaiveDateTime,
        lat: f64,
        lon: f64,
        azimuth: f64,
    ) -> Result<Profile, ProfileError> {
        let series = TimeIndexedSeries::from_selection(selection, self.config.opener)?;
        self.extract_series(&series, start, stop, lat, lon, azimuth)
    }

    /// Extract a profile for `[start, stop]` at `(lat, lon)`.
    ///
    /// Velocities are returned along `azimuth` (degrees clockwise from
    /// north) and across it.
    pub fn extract_series(
        &mut self,
        series: &TimeIndexedSeries,
        start: NaiveDateTime,
        stop: NaiveDateTime,
        lat: f64,
        lon: f64,
        azimuth: f64,
    ) -> Result<Profile, ProfileError> {
        let subset = series.subset(start, stop)?;
        debug!(files = subset.len(), %start, %stop, lat, lon, "extracting profile");

        let mut progress = ProgressReporter::new(subset.len(), self.config.progress_interval_pct);
        let mut target: Option<Target> = None;
        let mut records = Vec::new();

        for handle in subset.handles() {
            let locator = handle.locator();
            let dataset = handle.open()?;

            let current = match target {
                Some(t) => {
                    let found = dataset
                        .grid_shape()
                        .map_err(|e| ArchiveError::source_at(locator, e))?;
                    if found != t.shape {
                        return Err(ProfileError::InconsistentGrid {
                            locator: locator.to_string(),
                            expected: t.shape,
                            found,
                        });
                    }
                    t
                }
                None => {
                    let t = self.locate(&*dataset, locator, lat, lon)?;
                    target = Some(t);
                    t
                }
            };

            let last_time = records.last().map(|r: &ProfileRecord| r.time);
            let added = self
                .read_dataset(&*dataset, current.cell, start, stop, last_time, azimuth, &mut records)
                .map_err(|e| ArchiveError::source_at(locator, e))?;
            if added == 0 {
                warn!(locator, "dataset contributed no time steps");
            } else {
                debug!(locator, time_steps = added, "read dataset");
            }

            drop(dataset);
            progress.advance(locator);
        }

        let target = target.ok_or(ArchiveError::EmptySeries)?;
        Ok(Profile {
            lat,
            lon,
            azimuth,
            position: target.position,
            cell: target.cell,
            records,
        })
    }

    /// Locate the query point on the grid of `dataset`.
    fn locate(
        &mut self,
        dataset: &dyn GridSource,
        locator: &str,
        lat: f64,
        lon: f64,
    ) -> Result<Target, ProfileError> {
        let (lat_grid, lon_grid) = dataset
            .read_lat_lon()
            .map_err(|e| ArchiveError::source_at(locator, e))?;

        let resolver = match self.resolver.take() {
            Some(resolver) if resolver.has_grid(&lat_grid, &lon_grid) => resolver,
            _ => GridCoordinateResolver::new(lat_grid, lon_grid, self.config.inversion)?,
        };
        let resolver = self.resolver.insert(resolver);

        let position = resolver.resolve(lat, lon)?;
        let cell = resolver.nearest_cell(position);
        debug!(x = position.x, y = position.y, j = cell.j, i = cell.i, "located query point");
        Ok(Target {
            position,
            cell,
            shape: resolver.shape(),
        })
    }

    /// Append the new time steps of one dataset, returning how many were added.
    #[allow(clippy::too_many_arguments)]
    fn read_dataset(
        &self,
        dataset: &dyn GridSource,
        cell: GridCell,
        start: NaiveDateTime,
        stop: NaiveDateTime,
        last_time: Option<NaiveDateTime>,
        azimuth: f64,
        records: &mut Vec<ProfileRecord>,
    ) -> Result<usize, SourceError> {
        let times = dataset.read_times()?;

        let mut last = last_time;
        let mut selected = Vec::new();
        for (n, &time) in times.iter().enumerate() {
            if time < start || time > stop || last.is_some_and(|l| time <= l) {
                continue;
            }
            selected.push(n);
            last = Some(time);
        }
        if selected.is_empty() {
            return Ok(0);
        }

        let point = PointData::read(dataset, &self.config.names, cell, times.len())?;
        let rotation = AzimuthRotation::new(azimuth, point.angle);
        for &n in &selected {
            records.push(point.record(n, times[n], rotation, self.config.density_model));
        }
        Ok(selected.len())
    }
}

fn find<'a>(source: &dyn GridSource, names: &'a [String]) -> Option<&'a str> {
    names.iter().map(String::as_str).find(|name| source.has_variable(name))
}

fn require<'a>(source: &dyn GridSource, names: &'a [String]) -> Result<&'a str, SourceError> {
    find(source, names).ok_or_else(|| SourceError::MissingVariable(names.join("/")))
}

/// Check a column against the time and level counts of the dataset.
fn check_column(name: &str, column: &Column, n_times: usize, n_levels: usize) -> Result<(), SourceError> {
    if column.is_time_varying() && column.n_times() != n_times {
        return Err(SourceError::InvalidData(format!(
            "{name} has {} time steps, time coordinate has {n_times}",
            column.n_times()
        )));
    }
    if column.has_levels() && column.n_levels() != n_levels {
        return Err(SourceError::InvalidData(format!(
            "{name} has {} levels, expected {n_levels}",
            column.n_levels()
        )));
    }
    Ok(())
}

fn is_wet(mask: f64) -> bool {
    mask.is_finite() && mask != 0.0
}

/// Velocity points relative to rho points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stagger {
    Xi,
    Eta,
}

/// Faces of a staggered axis adjacent to rho index `index`.
fn adjacent_faces(index: usize, n_faces: usize) -> Vec<usize> {
    let lo = index.saturating_sub(1);
    let hi = index.min(n_faces - 1);
    if lo == hi { vec![lo] } else { vec![lo, hi] }
}

/// Velocity component at a rho point, averaged over its faces.
struct FaceAverage {
    name: String,
    mask_name: Option<String>,
    faces: Vec<(Column, Option<Column>)>,
}

impl FaceAverage {
    fn read(
        source: &dyn GridSource,
        name: &str,
        mask: Option<&str>,
        shape: GridShape,
        cell: GridCell,
        stagger: Stagger,
    ) -> Result<Self, SourceError> {
        let layout = source
            .layout(name)
            .ok_or_else(|| SourceError::InvalidData(format!("variable {name} is not gridded")))?;
        let grid = layout.horizontal();
        let GridCell { j, i } = cell;

        let points: Vec<(usize, usize)> = if grid == shape {
            vec![(j, i)]
        } else {
            match stagger {
                Stagger::Xi if grid.n_y == shape.n_y && grid.n_x + 1 == shape.n_x => {
                    adjacent_faces(i, grid.n_x).into_iter().map(|f| (j, f)).collect()
                }
                Stagger::Eta if grid.n_x == shape.n_x && grid.n_y + 1 == shape.n_y => {
                    adjacent_faces(j, grid.n_y).into_iter().map(|f| (f, i)).collect()
                }
                _ => {
                    return Err(SourceError::InvalidData(format!(
                        "variable {name} is on a {grid} grid, rho grid is {shape}"
                    )));
                }
            }
        };

        let mask = mask.filter(|m| source.layout(m).is_some_and(|l| l.horizontal() == grid));
        let faces = points
            .into_iter()
            .map(|(fj, fi)| {
                let values = source.read_column(name, fj, fi)?;
                let mask = mask.map(|m| source.read_column(m, fj, fi)).transpose()?;
                Ok((values, mask))
            })
            .collect::<Result<Vec<_>, SourceError>>()?;
        Ok(Self {
            name: name.to_string(),
            mask_name: mask.map(str::to_string),
            faces,
        })
    }

    /// Check values and masks of every face. Only the surface level of a mask is read.
    fn check(&self, n_times: usize, n_levels: usize) -> Result<(), SourceError> {
        for (values, mask) in &self.faces {
            check_column(&self.name, values, n_times, n_levels)?;
            if let (Some(name), Some(mask)) = (&self.mask_name, mask) {
                check_column(name, mask, n_times, mask.n_levels())?;
            }
        }
        Ok(())
    }

    /// Mean over faces, with land and missing samples as zero.
    fn get(&self, t: usize, k: usize) -> f64 {
        let sum: f64 = self
            .faces
            .iter()
            .map(|(values, mask)| {
                let v = values.get(t, k);
                let wet = mask.as_ref().is_none_or(|m| is_wet(m.get(t, 0)));
                if wet && v.is_finite() { v } else { 0.0 }
            })
            .sum();
        sum / self.faces.len() as f64
    }
}

/// All columns of one dataset at the query point.
struct PointData {
    temp: Column,
    salt: Column,
    /// Stored density and the offset to add to it
    density: Option<(Column, f64)>,
    u: FaceAverage,
    v: FaceAverage,
    angle: f64,
    wet: bool,
    levels: VerticalLevels,
    zeta: Option<Column>,
    h: f64,
    n_levels: usize,
}

impl PointData {
    fn read(
        source: &dyn GridSource,
        names: &VariableNames,
        cell: GridCell,
        n_times: usize,
    ) -> Result<Self, SourceError> {
        let GridCell { j, i } = cell;
        let shape = source.grid_shape()?;

        let temp_name = require(source, &names.temp)?;
        let temp = source.read_column(temp_name, j, i)?;
        let n_levels = temp.n_levels();
        check_column(temp_name, &temp, n_times, n_levels)?;

        let salt_name = require(source, &names.salt)?;
        let salt = source.read_column(salt_name, j, i)?;
        check_column(salt_name, &salt, n_times, n_levels)?;

        let stored = find(source, &names.dens)
            .map(|name| (name, 0.0))
            .or_else(|| find(source, &names.rho_anomaly).map(|name| (name, RHO_ANOMALY_OFFSET)));
        let density = match stored {
            Some((name, offset)) => {
                let column = source.read_column(name, j, i)?;
                check_column(name, &column, n_times, n_levels)?;
                Some((column, offset))
            }
            None => None,
        };

        let u_name = require(source, &names.u)?;
        let u = FaceAverage::read(source, u_name, find(source, &names.mask_u), shape, cell, Stagger::Xi)?;
        let v_name = require(source, &names.v)?;
        let v = FaceAverage::read(source, v_name, find(source, &names.mask_v), shape, cell, Stagger::Eta)?;
        u.check(n_times, n_levels)?;
        v.check(n_times, n_levels)?;

        let angle = match find(source, &names.angle) {
            Some(name) => source.read_column(name, j, i)?.get(0, 0),
            None => 0.0,
        };
        let wet = match find(source, &names.mask_rho) {
            Some(name) => is_wet(source.read_column(name, j, i)?.get(0, 0)),
            None => true,
        };

        let levels = match VerticalLevels::from_source(source) {
            Ok(levels) => levels,
            Err(SourceError::MissingVariable(_)) if !temp.has_levels() => VerticalLevels::Fixed(vec![0.0]),
            Err(e) => return Err(e),
        };
        if levels.n_levels() != n_levels {
            return Err(SourceError::InvalidData(format!(
                "vertical coordinate has {} levels, {temp_name} has {n_levels}",
                levels.n_levels()
            )));
        }

        let (zeta, h) = if levels.is_terrain_following() {
            let h = source.read_column(require(source, &names.h)?, j, i)?.get(0, 0);
            let zeta = match find(source, &names.zeta) {
                Some(name) => {
                    let column = source.read_column(name, j, i)?;
                    check_column(name, &column, n_times, n_levels)?;
                    Some(column)
                }
                None => None,
            };
            (zeta, h)
        } else {
            (None, 0.0)
        };

        Ok(Self {
            temp,
            salt,
            density,
            u,
            v,
            angle: if angle.is_finite() { angle } else { 0.0 },
            wet,
            levels,
            zeta,
            h,
            n_levels,
        })
    }

    fn record(
        &self,
        n: usize,
        time: NaiveDateTime,
        rotation: AzimuthRotation,
        density_model: DensityModel,
    ) -> ProfileRecord {
        let zeta = self
            .zeta
            .as_ref()
            .map(|z| z.get(n, 0))
            .filter(|z| z.is_finite())
            .unwrap_or(0.0);
        let mut depth = vec![0.0; self.n_levels];
        self.levels.depths_into(zeta, self.h, &mut depth);

        let mut record = ProfileRecord {
            time,
            temp: Vec::with_capacity(self.n_levels),
            salt: Vec::with_capacity(self.n_levels),
            dens: Vec::with_capacity(self.n_levels),
            u: Vec::with_capacity(self.n_levels),
            v: Vec::with_capacity(self.n_levels),
            depth,
        };
        for k in 0..self.n_levels {
            let temp = self.temp.get(n, k);
            let salt = self.salt.get(n, k);
            let dens = match &self.density {
                Some((column, offset)) => column.get(n, k) + offset,
                None => density_model.density(temp, salt, record.depth[k]),
            };
            let (along, cross) = if self.wet {
                rotation.apply(self.u.get(n, k), self.v.get(n, k))
            } else {
                (0.0, 0.0)
            };

            record.temp.push(temp);
            record.salt.push(salt);
            record.dens.push(dens);
            record.u.push(along);
            record.v.push(cross);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemorySource, VariableLayout};
    use faer::Mat;

    /// 3x4 surface-only dataset with two time steps and a `mask_u` of `mask_times` steps.
    fn surface_source(mask_times: usize) -> MemorySource {
        let lat = Mat::from_fn(3, 4, |j, i| 60.0 + 0.01 * j as f64 + 0.001 * i as f64);
        let lon = Mat::from_fn(3, 4, |j, i| 5.0 + 0.02 * i as f64);
        MemorySource::new(lat, lon)
            .unwrap()
            .with_field_fn("temp", VariableLayout::surface_series(2, 3, 4), |_, _, _, _| 8.0)
            .unwrap()
            .with_field_fn("salt", VariableLayout::surface_series(2, 3, 4), |_, _, _, _| 34.0)
            .unwrap()
            .with_field_fn("u", VariableLayout::surface_series(2, 3, 3), |_, _, _, _| 0.1)
            .unwrap()
            .with_field_fn("v", VariableLayout::surface_series(2, 2, 4), |_, _, _, _| 0.0)
            .unwrap()
            .with_field_fn("mask_u", VariableLayout::surface_series(mask_times, 3, 3), |_, _, _, _| 1.0)
            .unwrap()
    }

    #[test]
    fn test_adjacent_faces() {
        assert_eq!(adjacent_faces(0, 4), [0]);
        assert_eq!(adjacent_faces(2, 4), [1, 2]);
        assert_eq!(adjacent_faces(4, 4), [3]);
    }

    #[test]
    fn test_is_wet() {
        assert!(is_wet(1.0));
        assert!(!is_wet(0.0));
        assert!(!is_wet(f64::NAN));
    }

    #[test]
    fn test_velocity_mask_time_length_checked() {
        let names = VariableNames::default();
        let cell = GridCell { j: 1, i: 1 };

        let source = surface_source(3);
        let result = PointData::read(&source, &names, cell, 2);
        assert!(matches!(result, Err(SourceError::InvalidData(ref msg)) if msg.contains("mask_u")));

        let source = surface_source(2);
        let point = PointData::read(&source, &names, cell, 2).unwrap();
        assert!((point.u.get(1, 0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_config_builder() {
        let config = ExtractConfig::new()
            .with_cache_capacity(0)
            .with_progress_interval(25)
            .with_density_model(DensityModel::Surface)
            .with_names(VariableNames::default().with_temp(&["potential_temperature"]));
        assert_eq!(config.inversion.cache_capacity, 0);
        assert_eq!(config.progress_interval_pct, 25);
        assert_eq!(config.density_model, DensityModel::Surface);
        assert_eq!(config.names.temp, ["potential_temperature"]);
        assert_eq!(config.names.salt, ["salt", "salinity"]);
    }
}
