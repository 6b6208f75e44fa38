// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Index ranges for partial reads of array values.
//!
//! The text form is a comma separated list of dimensions, each either a
//! single index (`"4"`) or an inclusive `lo:hi` pair with `lo < hi`
//! (`"0:3"`). Only the first dimension is applied, since [`Variant`] arrays
//! are one-dimensional.

use std::fmt;
use std::str::FromStr;

use crate::error::NodeError;
use crate::types::{StatusCode, Variant};

/// One dimension of a [`NumericRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDimension {
    /// A single index.
    Index(usize),
    /// An inclusive span of indexes.
    Span {
        /// First index.
        low: usize,
        /// Last index (inclusive).
        high: usize,
    },
}

impl RangeDimension {
    fn bounds(self) -> (usize, usize) {
        match self {
            Self::Index(i) => (i, i),
            Self::Span { low, high } => (low, high),
        }
    }
}

/// A parsed index range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericRange {
    dimensions: Vec<RangeDimension>,
}

impl NumericRange {
    /// Returns the parsed dimensions.
    pub fn dimensions(&self) -> &[RangeDimension] {
        &self.dimensions
    }

    /// Applies the first dimension of this range to `value`.
    ///
    /// A range that starts past the end of the array yields
    /// `BadIndexRangeNoData`; one that ends past it is truncated. Non-array
    /// values yield `BadIndexRangeInvalid`.
    pub fn apply(&self, value: &Variant) -> Result<Variant, StatusCode> {
        let Variant::Array(items) = value else {
            return Err(StatusCode::BAD_INDEX_RANGE_INVALID);
        };

        let (low, high) = self
            .dimensions
            .first()
            .map(|d| d.bounds())
            .ok_or(StatusCode::BAD_INDEX_RANGE_INVALID)?;

        if low >= items.len() {
            return Err(StatusCode::BAD_INDEX_RANGE_NO_DATA);
        }
        let high = high.min(items.len() - 1);

        Ok(Variant::Array(items[low..=high].to_vec()))
    }

    fn parse_dimension(range: &str, part: &str) -> Result<RangeDimension, NodeError> {
        let index = |text: &str| {
            text.trim()
                .parse::<usize>()
                .map_err(|_| NodeError::invalid_index_range(range, format!("'{}' is not an index", text)))
        };

        match part.split_once(':') {
            None => Ok(RangeDimension::Index(index(part)?)),
            Some((lo, hi)) => {
                let (low, high) = (index(lo)?, index(hi)?);
                if low >= high {
                    return Err(NodeError::invalid_index_range(
                        range,
                        "low bound must be less than high bound",
                    ));
                }
                Ok(RangeDimension::Span { low, high })
            }
        }
    }
}

impl FromStr for NumericRange {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(NodeError::invalid_index_range(s, "empty range"));
        }
        let dimensions = s
            .split(',')
            .map(|part| Self::parse_dimension(s, part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { dimensions })
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dim) in self.dimensions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match dim {
                RangeDimension::Index(v) => write!(f, "{}", v)?,
                RangeDimension::Span { low, high } => write!(f, "{}:{}", low, high)?,
            }
        }
        Ok(())
    }
}
