// End-to-end integration tests for the deckvoice API
//
// Each test spins up the full router on an ephemeral port with the local
// speech model replaced by an in-process fake, so no accelerator or model
// weights are needed. Remote providers run against axum mock servers that
// imitate the MiniMax and DashScope endpoints.
//
// Every test gets its own scratch directory and its own server, so tests
// run in parallel without sharing state.

mod test_narration;
mod test_providers;
