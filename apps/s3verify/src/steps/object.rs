//! Steps for fanned-out object scenarios.

use cucumber::{then, when};
use s3verify_core::error::HarnessError;

use crate::world::{Operation, S3World};

#[when(regex = r#"^put object with key "(.{1,})"$"#)]
async fn put_object(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.put_object(&key).await
}

#[then(regex = r"^put object status code is (\d+)$")]
fn put_object_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::PutObject, status)
}

#[when(regex = r#"^get object with key "(.{1,})"$"#)]
async fn get_object(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.get_object(&key).await
}

#[then(regex = r"^get object status code is (\d+)$")]
fn get_object_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::GetObject, status)
}

#[then(regex = r"^get object content length is (\d+)$")]
fn get_object_total_length(world: &mut S3World, length: u64) -> Result<(), HarnessError> {
    world.check_total_content_length(length)
}

#[then(regex = r"^get object content length of each worker is (\d+)$")]
fn get_object_each_length(world: &mut S3World, length: u64) -> Result<(), HarnessError> {
    world.check_each_content_length(length)
}

#[when(regex = r#"^delete object with key "(.{1,})"$"#)]
async fn delete_object(world: &mut S3World, key: String) -> Result<(), HarnessError> {
    world.delete_object(&key).await
}

#[then(regex = r"^delete object status code is (\d+)$")]
fn delete_object_status(world: &mut S3World, status: u16) -> Result<(), HarnessError> {
    world.check_status(Operation::DeleteObject, status)
}
