//! Steps for multipart upload scenarios.

use cucumber::{then, when};
use s3verify_core::error::HarnessError;

use crate::world::{MultipartAction, Operation, PartOrdinal, Rejection, S3World};

#[when(regex = r#"^initiate multipart upload with key "(.{1,})"$"#)]
async fn initiate(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.initiate_multipart_upload(&key).await
}

#[then(regex = r"^initiate multipart upload status code is (\d+)$")]
fn initiate_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::InitiateMultipartUpload, status)
}

#[when(regex = r#"^upload the (first|second|third) part with key "(.{1,})"$"#)]
async fn upload_part(
    world: &mut S3World,
    ordinal: PartOrdinal,
    key: String,
) -> Result<(), HarnessError> {
    world.upload_part(ordinal, &key).await
}

#[then(regex = r"^upload the (first|second|third) part status code is (\d+)$")]
fn upload_part_status(
    world: &mut S3World,
    ordinal: PartOrdinal,
    status: u16,
) -> Result<(), HarnessError> {
    world.check_status(Operation::UploadPart(ordinal), status)
}

#[when(regex = r#"^list multipart with key "(.{1,})"$"#)]
async fn list_parts(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.list_parts(&key).await
}

#[then(regex = r"^list multipart status code is (\d+)$")]
fn list_parts_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::ListParts, status)
}

#[then(regex = r"^list multipart object parts count is (\d+)$")]
fn listed_part_count(world: &mut S3World, count: usize) -> Result<(), HarnessError> {
    world.check_listed_part_count(count)
}

#[when(regex = r#"^complete multipart upload with key "(.{1,})"$"#)]
async fn complete(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.complete_multipart_upload(&key).await
}

#[then(regex = r"^complete multipart upload status code is (\d+)$")]
fn complete_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::CompleteMultipartUpload, status)
}

#[when(regex = r#"^abort multipart upload with key "(.{1,})"$"#)]
async fn abort(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.abort_multipart_upload(&key).await
}

#[then(regex = r"^abort multipart upload status code is (\d+)$")]
fn abort_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::AbortMultipartUpload, status)
}

#[when(regex = r#"^get the multipart object with key "(.{1,})"$"#)]
async fn get_multipart_object(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.get_multipart_object(&key).await
}

#[then(regex = r"^get the multipart object status code is (\d+)$")]
fn get_multipart_object_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::GetMultipartObject, status)
}

#[then(regex = r"^the multipart object content length is (\d+)$")]
fn multipart_object_length(world: &mut S3World, length: u64) -> Result<(), HarnessError> {
    world.check_multipart_object_length(length)
}

#[when(regex = r#"^delete the multipart object with key "(.{1,})"$"#)]
async fn delete_multipart_object(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.delete_multipart_object(&key).await
}

#[then(regex = r"^delete the multipart object status code is (\d+)$")]
fn delete_multipart_object_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::DeleteMultipartObject, status)
}

#[when(regex = r#"^attempt to upload the (first|second|third) part with key "(.{1,})"$"#)]
async fn attempt_upload(
    world: &mut S3World,
    ordinal: PartOrdinal,
    key: String,
) -> Result<(), HarnessError> {
    world.attempt(MultipartAction::Upload(ordinal), &key).await
}

#[when(regex = r#"^attempt to list multipart with key "(.{1,})"$"#)]
async fn attempt_list(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.attempt(MultipartAction::List, &key).await
}

#[when(regex = r#"^attempt to complete multipart upload with key "(.{1,})"$"#)]
async fn attempt_complete(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.attempt(MultipartAction::Complete, &key).await
}

#[when(regex = r#"^attempt to abort multipart upload with key "(.{1,})"$"#)]
async fn attempt_abort(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.attempt(MultipartAction::Abort, &key).await
}

#[then(regex = r"^the multipart session rejects it as (closed|invalid)$")]
fn rejected_as(world: &mut S3World, rejection: Rejection) -> Result<(), HarnessError> {
    world.check_rejection(rejection)
}
