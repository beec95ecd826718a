mod sam;
