//! # MongoDB
//!
//! Document store holding the five collections. Persistence is
//! read-modify-write at document granularity: each handler loads whole
//! documents, mutates them in memory, and replaces them. There is no
//! cross-document transaction, so the three records a booking touches
//! are written independently (the handlers stage every mutation in
//! memory before the first write to keep a single request from
//! half-applying).

use mongodb::{Client, Collection, bson::doc};

use crate::{
    error::AppError,
    models::{Booking, College, CollegeAuthority, TestCenter, TestCenterManager},
};

pub struct Db {
    pub colleges: Collection<College>,
    pub test_centers: Collection<TestCenter>,
    pub bookings: Collection<Booking>,
    pub college_authorities: Collection<CollegeAuthority>,
    pub test_center_managers: Collection<TestCenterManager>,
}

pub async fn init_mongo(mongo_url: &str, mongo_db: &str) -> Db {
    // Connections are established lazily, per operation.
    let client = Client::with_uri_str(mongo_url).await.unwrap();
    let db = client.database(mongo_db);

    Db {
        colleges: db.collection("colleges"),
        test_centers: db.collection("test_centers"),
        bookings: db.collection("bookings"),
        college_authorities: db.collection("college_authorities"),
        test_center_managers: db.collection("test_center_managers"),
    }
}

impl Db {
    pub async fn college(&self, id: &str) -> Result<College, AppError> {
        self.colleges
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound("College".into()))
    }

    pub async fn test_center(&self, id: &str) -> Result<TestCenter, AppError> {
        self.test_centers
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test Center {id}")))
    }

    pub async fn booking(&self, id: &str) -> Result<Booking, AppError> {
        self.bookings
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound("Booking".into()))
    }

    pub async fn college_authority(&self, id: &str) -> Result<CollegeAuthority, AppError> {
        self.college_authorities
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound("College authority".into()))
    }

    pub async fn test_center_manager(&self, id: &str) -> Result<TestCenterManager, AppError> {
        self.test_center_managers
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AppError::NotFound("Test center manager".into()))
    }

    pub async fn save_college(&self, college: &College) -> Result<(), AppError> {
        self.colleges
            .replace_one(doc! { "_id": &college.id }, college)
            .await?;
        Ok(())
    }

    pub async fn save_test_center(&self, center: &TestCenter) -> Result<(), AppError> {
        self.test_centers
            .replace_one(doc! { "_id": &center.id }, center)
            .await?;
        Ok(())
    }

    pub async fn save_booking(&self, booking: &Booking) -> Result<(), AppError> {
        self.bookings
            .replace_one(doc! { "_id": &booking.id }, booking)
            .await?;
        Ok(())
    }
}
