// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor module — the stateful session driving load, handle placement, crop,
// filters and export.

pub mod session;

pub use session::EditorSession;
