//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use api_runtime::{
    ApiClient, ApiClientBuilder, CollectingSink, ContractCatalog, RetryPolicy, RetryStrategy,
};
use url::Url;
use wiremock::MockServer;

/// Advertiser and report operations, secured by an API key header.
pub const ADVERTISER_CONTRACT: &str = r##"
openapi: 3.0.0
info:
  title: Advertiser API
  version: "1.0"
tags:
  - name: Advertiser
  - name: Report
components:
  securitySchemes:
    ApiKeyAuth:
      type: apiKey
      in: header
      name: X-Adzerk-ApiKey
  schemas:
    Advertiser:
      type: object
      required: [title]
      properties:
        title:
          type: string
        isActive:
          type: boolean
          default: true
        createdOn:
          type: string
          format: date-time
          nullable: true
security:
  - ApiKeyAuth: []
paths:
  /advertiser:
    get:
      operationId: list
      tags: [Advertiser]
      parameters:
        - name: page
          in: query
          schema:
            type: integer
            default: 1
        - name: pageSize
          in: query
          schema:
            type: integer
        - name: X-Request-Source
          in: header
          schema:
            type: string
      responses:
        "200":
          description: ok
    post:
      operationId: create
      tags: [Advertiser]
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/Advertiser"
      responses:
        "200":
          description: ok
  /advertiser/{id}:
    parameters:
      - name: id
        in: path
        required: true
        schema:
          type: integer
    get:
      operationId: get
      tags: [Advertiser]
      responses:
        "200":
          description: ok
    put:
      operationId: update
      tags: [Advertiser]
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              properties:
                id:
                  type: integer
                title:
                  type: string
                  nullable: true
                isActive:
                  type: boolean
                  nullable: true
      responses:
        "200":
          description: ok
  /report/stream:
    post:
      operationId: stream
      tags: [Report]
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                startDate:
                  type: string
                  format: date
                  nullable: true
      responses:
        "200":
          description: records
          content:
            application/x-ndjson:
              schema:
                type: object
"##;

/// Adds `advertiser.delete` to the first document and a `creative` resource.
pub const CREATIVE_CONTRACT: &str = r##"
openapi: 3.0.0
info:
  title: Creative API
  version: "1.0"
paths:
  /advertiser/{id}:
    delete:
      operationId: delete
      tags: [Advertiser]
      responses:
        "204":
          description: deleted
  /creative/upload:
    post:
      operationId: upload
      tags: [Creative]
      requestBody:
        required: true
        content:
          multipart/form-data:
            schema:
              type: object
              required: [image]
              properties:
                name:
                  type: string
                  nullable: true
                image:
                  type: string
                  format: binary
      responses:
        "200":
          description: ok
"##;

pub fn catalog() -> ContractCatalog {
    ContractCatalog::from_yaml_documents([ADVERTISER_CONTRACT, CREATIVE_CONTRACT])
        .expect("fixture contracts are valid")
}

/// Retries quickly so rate-limit tests finish in milliseconds.
pub fn fast_retry(strategy: RetryStrategy, max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        strategy,
        max_attempts,
        base_delay_ms: 1,
        max_delay_ms: 2,
    }
}

pub fn builder(server: &MockServer) -> ApiClientBuilder {
    let base_url = Url::parse(&server.uri()).expect("mock server uri");
    ApiClient::builder(catalog(), base_url)
        .credential("ApiKeyAuth", "secret")
        .retry_policy(fast_retry(RetryStrategy::Exponential, 3))
}

pub fn client(server: &MockServer) -> ApiClient {
    builder(server).build().expect("client builds")
}

pub fn collecting() -> (Arc<CollectingSink>, CollectingSink) {
    let sink = CollectingSink::new();
    (Arc::new(sink.clone()), sink)
}
