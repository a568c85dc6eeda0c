// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Handwriting render pipeline: text is tokenized losslessly, laid out on a
// measurement surface, split greedily into pages, then rasterized page by page.

pub mod metrics;
pub mod paginate;
pub mod raster;
pub mod surface;
pub mod tokenize;
